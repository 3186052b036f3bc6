mod triangle;

use triframe_engine::device::DeviceConfig;
use triframe_engine::logging::{LoggingConfig, init_logging};
use triframe_engine::window::SurfaceConfig;

use triangle::Triangle;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = DeviceConfig::from_env()?;
    log::info!("starting '{}' with {:?}", Triangle::NAME, config.backend);

    triframe_engine::core::run(
        SurfaceConfig::new(Triangle::NAME, 1280, 720),
        config,
        Triangle::new(),
    )
}
