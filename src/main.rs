use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{info, error, warn};
use observable::observable::config::Config;
use observable::observable::init;
use observable::{Event, ExpenseObserver, Registry, Subscriber};

const CONFIG_PATH: &str = "config.toml";
const EXPENSES: &str = "expenses";

fn init_logger(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}:{}] {} - {}",
                buf.timestamp_millis(),
                record.module_path().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn load_config() -> Config {
    if !Path::new(CONFIG_PATH).exists() {
        return Config::default();
    }
    match Config::from_toml_file(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}, using defaults", CONFIG_PATH, e);
            Config::default()
        }
    }
}

/// Publishes from plain OS threads while a late subscriber joins mid-flight
fn publish_from_threads(registry: &Arc<Registry>, events: usize) -> Arc<ExpenseObserver> {
    let late = Arc::new(ExpenseObserver::new("Subscriber-late"));

    let publishers: Vec<_> = (0..events)
        .map(|i| {
            let registry = Arc::clone(registry);
            thread::spawn(move || {
                let event = Event::new(format!("Adding Expenses #{}", i)).with(EXPENSES, 1);
                if let Err(e) = registry.publish(&event, EXPENSES) {
                    error!("Publish {} failed: {}", i, e);
                }
            })
        })
        .collect();

    if let Err(e) = registry.subscribe(&late, EXPENSES) {
        warn!("Late subscriber rejected: {}", e);
    }

    for publisher in publishers {
        if publisher.join().is_err() {
            error!("Publisher thread panicked");
        }
    }
    late
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = load_config();
    init_logger(&config.logging.level);

    info!("Expenses demo starting up");

    let (registry, dispatcher) = match init(&config) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Failed to initialise registry: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };

    let observers: Vec<Arc<ExpenseObserver>> = (0..5)
        .map(|i| Arc::new(ExpenseObserver::new(format!("Subscriber-{}", i)).with_random_delay(Duration::from_millis(20))))
        .collect();
    for observer in &observers {
        if let Err(e) = registry.subscribe(observer, EXPENSES) {
            warn!("{}", e);
        }
    }

    let threaded = Arc::clone(&registry);
    let late = tokio::task::spawn_blocking(move || publish_from_threads(&threaded, 5))
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let tasks: Vec<_> = (0..5)
        .map(|i| dispatcher.submit(Event::new(format!("Queued Expenses #{}", i)).with(EXPENSES, 1), EXPENSES))
        .collect();
    for task in tasks {
        let id = task.id();
        if let Err(e) = task.wait().await {
            error!("Publish task {} failed: {}", id, e);
        }
    }

    for observer in observers.iter().chain(std::iter::once(&late)) {
        info!("{} total expenses: {}", observer.name(), observer.total());
    }
    info!("{} subscriber(s) on '{}'", registry.subscriber_count(EXPENSES), EXPENSES);

    dispatcher.shutdown();
    Ok(())
}
