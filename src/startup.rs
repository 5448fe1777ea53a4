use crate::cli::{Commands, Console};
use crate::shutdown;
use organiser::components::event_store::EventStoreComponent;
use organiser::components::notifications::{Notifications, Notifier};
use organiser::components::ComponentManager;
use organiser::config::Config;
use organiser::error::{component_error, Error};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn")),
        )
        // stdout belongs to the console
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Bring up the components and run the requested command
pub async fn run(config: Arc<RwLock<Config>>, command: Commands) -> miette::Result<()> {
    let ttl = config.read().await.notification_ttl();
    let notifier = Notifier::new(ttl);
    // Subscribe before anything can be reported
    let toasts = notifier.subscribe();

    // Initialize component manager
    let mut component_manager = ComponentManager::new(Arc::clone(&config));
    component_manager.register(Notifications::new(notifier.clone()));
    component_manager.register(EventStoreComponent::new(notifier));

    let component_manager = Arc::new(component_manager);
    component_manager.init_all().await?;

    let store = match component_manager.get::<EventStoreComponent>("event_store") {
        Some(component) => component.get_handle().await,
        None => None,
    }
    .ok_or_else(|| component_error("Event store is not available"))?;

    let mut console = Console::new(store, Arc::clone(&component_manager), toasts);

    let result = match command {
        Commands::Shell => {
            tokio::select! {
                result = console.run_shell() => result,
                _ = shutdown::wait_for_signal() => {
                    info!("Received shutdown signal, leaving shell");
                    Ok(())
                }
            }
        }
        command => console.run_once(command).await,
    };

    if let Err(e) = component_manager.shutdown_all().await {
        error!("Error shutting down components: {:?}", e);
    } else {
        info!("All components shut down successfully");
    }

    result.map_err(Into::into)
}
