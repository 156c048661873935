//! Application startup wiring with construct
//!
//! Run with:
//!   cargo run --example startup --features logging-pretty
//!
//! Set `RUST_LOG=construct=trace` to see every resolution.

use construct::{Constructible, Container, DiError, logging};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

struct Settings {
    database_url: String,
}

struct Logger {
    prefix: &'static str,
}

impl Logger {
    fn log(&self, message: &str) {
        println!("[{}] {}", self.prefix, message);
    }
}

trait UserStore: Send + Sync {
    fn find(&self, id: u64) -> Option<String>;
}

#[derive(Constructible)]
struct PostgresUserStore {
    #[inject]
    settings: Arc<Settings>,
    #[inject]
    logger: Arc<Logger>,
}

impl UserStore for PostgresUserStore {
    fn find(&self, id: u64) -> Option<String> {
        self.logger
            .log(&format!("lookup {id} on {}", self.settings.database_url));
        (id == 1).then(|| "ada".to_string())
    }
}

static REQUESTS: AtomicU64 = AtomicU64::new(0);

#[derive(Constructible)]
struct RequestHandler {
    #[inject]
    users: Arc<dyn UserStore>,
    #[inject]
    logger: Arc<Logger>,
    // Non-injected field uses Default
    served: u64,
}

impl RequestHandler {
    fn handle(&self, id: u64) -> String {
        REQUESTS.fetch_add(1, Ordering::SeqCst);
        match self.users.find(id) {
            Some(name) => format!("200 {name} (served {})", self.served),
            None => {
                self.logger.log(&format!("user {id} not found"));
                "404".to_string()
            }
        }
    }
}

#[derive(Constructible)]
struct MetricsExporter {
    #[inject]
    _endpoint: Arc<MetricsEndpoint>,
}

struct MetricsEndpoint;

fn main() -> Result<(), DiError> {
    if let Err(err) = logging::builder().pretty().construct_only().try_init() {
        eprintln!("{err}");
    }

    println!("=== construct startup demo ===\n");

    let container = Container::new();
    container
        .configure(|builder, _| {
            builder
                .register(|| Settings {
                    database_url: "postgres://localhost:5432/app".into(),
                })
                .single_instance();
            builder.register(|| Logger { prefix: "app" }).single_instance();
        })
        .build()?;

    // A second configuration pass may only add new keys
    let mut builder = container.configure(|_, _| {});
    builder
        .autowire::<PostgresUserStore>()?
        .as_type::<dyn UserStore>(|store| store)
        .single_instance();
    builder.autowire::<RequestHandler>()?;
    builder.autowire::<MetricsExporter>()?;
    builder.build()?;

    println!("Registered {} services:", container.len());
    for key in container.registered_types() {
        println!("  {key} ({:?})", container.lifetime_of_key(&key));
    }
    println!();

    let first = container.resolve::<RequestHandler>()?;
    let second = container.resolve::<RequestHandler>()?;
    println!("{}", first.handle(1));
    println!("{}", second.handle(2));
    println!(
        "Handlers distinct: {}, store shared: {}",
        !Arc::ptr_eq(&first, &second),
        Arc::ptr_eq(&first.users, &second.users)
    );
    println!("Requests served: {}\n", REQUESTS.load(Ordering::SeqCst));

    // The concrete store type is only reachable through its trait
    assert!(container.try_resolve::<PostgresUserStore>().is_none());

    match container.resolve::<MetricsExporter>() {
        Err(err) => println!("Expected failure: {err}"),
        Ok(_) => println!("MetricsExporter unexpectedly resolved"),
    }

    Ok(())
}
