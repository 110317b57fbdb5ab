use lazy_value::logger::{self, debug, info, o, warn};
use lazy_value::LazyValue;

fn read_manifest() -> Result<Vec<String>, String> {
   info!("reading manifest"; "path" => "Cargo.toml");
   let manifest = std::fs::read_to_string("Cargo.toml").map_err(|e| e.to_string())?;
   let names = manifest
      .lines()
      .filter(|line| line.starts_with("name"))
      .map(str::to_owned)
      .collect::<Vec<_>>();
   debug!("found {} name entries", names.len());
   Ok(names)
}

fn main() {
   // RUST_LOG=debug cargo run --example scoped_logging
   let _guard = match logger::init_env() {
      Ok(guard) => guard,
      Err(err) => {
         eprintln!("{}", err);
         return;
      }
   };

   let manifest = LazyValue::new(read_manifest);
   logger::with_fields(o!("request" => 1), || match manifest.get() {
      Ok(names) => info!("manifest ready"; "entries" => names.len()),
      Err(err) => warn!("manifest unavailable: {}", err),
   });

   // Second request hits the cache; nothing is read or logged by the computation.
   logger::with_fields(o!("request" => 2), || {
      if manifest.get().is_err() {
         logger::fatal!("manifest still unavailable");
      }
      info!("served from cache");
   });
}
