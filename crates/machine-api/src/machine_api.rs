use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::routes::{router, MachineApiServices};
use crate::server::{run_http_server, HttpServerConfig};

pub struct MachineApi {
    services: MachineApiServices,
    config: HttpServerConfig,
}

impl MachineApi {
    pub fn new(services: MachineApiServices, config: HttpServerConfig) -> Self {
        debug!("Initializing Machine API module");
        Self { services, config }
    }

    pub async fn run(self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        run_http_server(self.config, router(self.services), cancellation_token).await
    }
}
