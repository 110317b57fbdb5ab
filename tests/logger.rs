#![cfg(feature = "logger")]

use std::env;
use std::fmt;
use std::process::Command;
use std::sync::{Arc, Mutex};

use lazy_value::logger::{self, debug, error, info, o, warn, Logger};
use lazy_value::LazyValue;
use slog::{Drain, Key, OwnedKVList, Record, Serializer, KV};

/// Drain that renders every record as `LEVEL message key=value...` into a shared buffer.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<String>>>);

struct Line(String);

impl Serializer for Line {
   fn emit_arguments(&mut self, key: Key, val: &fmt::Arguments) -> slog::Result {
      self.0.push_str(&format!(" {}={}", key, val));
      Ok(())
   }
}

fn render(record: &Record, values: &OwnedKVList) -> String {
   let mut line = Line(format!("{} {}", record.level().as_short_str(), record.msg()));
   let _ = record.kv().serialize(record, &mut line);
   let _ = values.serialize(record, &mut line);
   line.0
}

impl Drain for Capture {
   type Ok = ();
   type Err = slog::Never;

   fn log(&self, record: &Record, values: &OwnedKVList) -> Result<(), slog::Never> {
      self.0.lock().unwrap().push(render(record, values));
      Ok(())
   }
}

/// Drain that writes rendered records straight to stderr, so they survive `process::exit`.
struct Stderr;

impl Drain for Stderr {
   type Ok = ();
   type Err = slog::Never;

   fn log(&self, record: &Record, values: &OwnedKVList) -> Result<(), slog::Never> {
      eprintln!("{}", render(record, values));
      Ok(())
   }
}

/// Set in the child process spawned by `test_fatal_logs_then_exits`.
const FATAL_CHILD_ENV: &str = "LAZY_VALUE_FATAL_CHILD";

impl Capture {
   fn logger(&self) -> Logger {
      Logger::root(self.clone(), o!())
   }

   fn lines(&self) -> Vec<String> {
      self.0.lock().unwrap().clone()
   }
}

#[test]
fn test_with_logger_routes_records() {
   let capture = Capture::default();
   logger::with_logger(&capture.logger(), || {
      info!("loaded {} entries", 3; "source" => "disk");
      warn!("slow read");
      error!("bad entry"; "line" => 7);
   });

   assert_eq!(
      capture.lines(),
      vec![
         "INFO loaded 3 entries source=disk".to_string(),
         "WARN slow read".to_string(),
         "ERRO bad entry line=7".to_string(),
      ]
   );
}

#[test]
fn test_debug_level_is_recorded() {
   let capture = Capture::default();
   logger::with_logger(&capture.logger(), || {
      debug!("verbose"; "step" => 1);
   });
   // Release builds compile out debug records unless slog's max-level features say otherwise.
   if cfg!(debug_assertions) {
      assert_eq!(capture.lines(), vec!["DEBG verbose step=1".to_string()]);
   }
}

#[test]
fn test_current_follows_scope() {
   let outer = Capture::default();
   let inner = Capture::default();

   logger::with_logger(&outer.logger(), || {
      slog::info!(logger::current(), "direct");
      logger::with_logger(&inner.logger(), || info!("nested"));
      info!("restored");
   });

   assert_eq!(outer.lines(), vec!["INFO direct".to_string(), "INFO restored".to_string()]);
   assert_eq!(inner.lines(), vec!["INFO nested".to_string()]);
}

#[test]
fn test_with_fields_adds_context() {
   let capture = Capture::default();
   logger::with_logger(&capture.logger(), || {
      logger::with_fields(o!("request" => 42), || info!("handled"));
      info!("outside");
   });

   assert_eq!(
      capture.lines(),
      vec!["INFO handled request=42".to_string(), "INFO outside".to_string()]
   );
}

#[test]
fn test_computation_logs_once() {
   let capture = Capture::default();
   let lazy = LazyValue::new(|| {
      info!("computing");
      Ok::<_, ()>(1)
   });

   logger::with_logger(&capture.logger(), || {
      for _ in 0..5 {
         assert_eq!(lazy.get(), Ok(&1));
      }
   });
   assert_eq!(capture.lines(), vec!["INFO computing".to_string()]);
}

#[test]
fn fatal_child_process() {
   if env::var_os(FATAL_CHILD_ENV).is_none() {
      return;
   }
   logger::with_logger(&Logger::root(Stderr, o!()), || {
      logger::fatal!("cannot continue"; "code" => 1);
   });
}

#[test]
fn test_fatal_logs_then_exits() {
   let output = Command::new(env::current_exe().unwrap())
      .args(["fatal_child_process", "--exact", "--nocapture", "--test-threads=1"])
      .env(FATAL_CHILD_ENV, "1")
      .output()
      .unwrap();

   assert_eq!(output.status.code(), Some(logger::FATAL_EXIT_CODE));
   let stderr = String::from_utf8_lossy(&output.stderr);
   assert!(stderr.contains("ERRO cannot continue code=1"), "stderr: {}", stderr);
}

#[test]
fn test_init_env_installs_once() {
   let guard = logger::init_env().expect("first install succeeds");

   // The `log` bridge can only be installed once per process.
   match logger::init_env() {
      Ok(second) => drop(second),
      Err(err) => {
         assert!(std::error::Error::source(&err).is_some());
         assert_eq!(err.to_string(), "failed to install the global logger");
      }
   }
   drop(guard);
}
