//! Timers and task spawning on the browser event loop.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::LocalBoxFuture;

use convo_core::ports::SchedulerPort;

pub struct GlooScheduler;

#[async_trait(?Send)]
impl SchedulerPort for GlooScheduler {
    async fn sleep(&self, ms: u64) {
        gloo_timers::future::sleep(Duration::from_millis(ms)).await;
    }

    fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(fut);
    }
}
