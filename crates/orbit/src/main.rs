use orbit::config;
use orbit::stage;
use orbit::sys::runtime;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = config::load_or_setup();
    log::info!("Loaded {} ring section(s)", config.sections.len());

    let (tx, rx) = async_channel::bounded(32);

    // Start Background Services
    runtime::start_background_services(tx);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(stage::run(config, rx, std::io::stdout().lock()))
}
