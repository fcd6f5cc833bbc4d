use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::events::AppEvent;

#[automock]
#[async_trait]
pub trait AppEventSink {
    async fn handle(&self, event: AppEvent) -> Result<()>;

    fn sink_name(&self) -> &'static str;
}
