use async_trait::async_trait;
use organiser::components::event_store::EventStoreComponent;
use organiser::components::notifications::{Notifications, Notifier};
use organiser::components::{Component, ComponentManager};
use organiser::config::Config;
use organiser::error::{component_error, OrganiserResult};
use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;

fn test_config() -> Config {
    Config {
        base_url: "http://127.0.0.1:8000".to_string(),
        api_prefix: "/organiser/api/events/".to_string(),
        csrf_token: "token".to_string(),
        request_timeout_secs: 10,
        notification_ttl_ms: 3000,
    }
}

/// Smoke test to verify that a config can be built and validated
#[tokio::test]
async fn test_config_builds_events_url() {
    let config = test_config();

    assert!(config.validate().is_ok());
    assert_eq!(
        config.events_url().unwrap().as_str(),
        "http://127.0.0.1:8000/organiser/api/events/"
    );
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
}

/// Component that records when it is initialised and shut down
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail_init: bool,
}

#[async_trait]
impl Component for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn init(&self, _config: Arc<RwLock<Config>>) -> OrganiserResult<()> {
        self.log.lock().unwrap().push(format!("init {}", self.name));
        if self.fail_init {
            return Err(component_error("init failed"));
        }
        Ok(())
    }

    async fn shutdown(&self) -> OrganiserResult<()> {
        self.log.lock().unwrap().push(format!("shutdown {}", self.name));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Components come up in registration order and go down in reverse
#[tokio::test]
async fn test_component_lifecycle_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut manager = ComponentManager::new(Arc::new(RwLock::new(test_config())));
    for (name, fail_init) in [("first", true), ("second", false)] {
        manager.register(Recorder {
            name,
            log: Arc::clone(&log),
            fail_init,
        });
    }

    // A failing component does not stop the others
    assert!(manager.init_all().await.is_ok());
    assert!(manager.shutdown_all().await.is_ok());

    assert_eq!(
        *log.lock().unwrap(),
        vec!["init first", "init second", "shutdown second", "shutdown first"]
    );
    assert!(manager.get::<Recorder>("second").is_some());
    assert!(manager.get::<Notifications>("second").is_none());
    assert!(manager.get_component_by_name("third").is_none());
}

/// The notifications component shows the newest notification as the toast
#[tokio::test]
async fn test_notifications_component_feeds_toast() {
    let notifier = Notifier::new(Duration::from_secs(60));
    let notifications = Notifications::new(notifier.clone());
    let config = Arc::new(RwLock::new(test_config()));

    notifications.init(config).await.unwrap();
    notifier.success("Event added successfully!");
    notifier.error("Failed to delete event");

    let toast = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(toast) = notifications.current_toast().await {
                if toast.is_error() {
                    return toast;
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(toast.message, "Failed to delete event");
    notifications.shutdown().await.unwrap();
}

/// Shutting down an event store that never started is an error
#[tokio::test]
async fn test_event_store_shutdown_before_init() {
    let component = EventStoreComponent::new(Notifier::new(Duration::from_secs(3)));

    assert!(component.get_handle().await.is_none());
    assert!(component.shutdown().await.is_err());
}
