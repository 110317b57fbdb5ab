use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_value::LazyValue;
use tokio::time::Duration;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn load_settings() -> Result<String, String> {
   // This runs only once, on whichever task gets there first
   COUNTER.fetch_add(1, Ordering::Relaxed);
   println!("Loading settings...");
   std::thread::sleep(Duration::from_millis(50));
   Ok("Async expensive data".to_string())
}

static SETTINGS: LazyValue<String, String> = LazyValue::new(load_settings);

#[tokio::main]
async fn main() {
   let tasks: Vec<_> = (0..5)
      .map(|_| {
         tokio::spawn(async {
            println!("Task access: {:?}", SETTINGS.get_async().await);
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   assert_eq!(SETTINGS.try_get(), Some(Ok(&"Async expensive data".to_string())));
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1); // Computation ran only once
   println!("Final settings: {:?}", SETTINGS.get_async().await);
}
