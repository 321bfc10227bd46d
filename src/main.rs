use anyhow::Result;
use infodengue_sweep::models::alert_api::InfoDengueProvider;
use infodengue_sweep::models::geo_utils::{IbgeDirectory, get_state_info};
use infodengue_sweep::models::report::{finalize, write_csv};
use infodengue_sweep::models::sweep::{FixedDelayLimiter, SweepConfig, SweepDriver};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut config = SweepConfig::default();
    if let Some(uf) = std::env::args().nth(1) {
        config = config.with_uf(uf);
    }
    if let Some(disease) = std::env::args().nth(2) {
        config = config.with_disease(disease.parse()?);
    }
    let state = get_state_info(&config.uf)?;

    let border = "=".repeat(64);
    println!("{border}");
    println!(
        "INFODENGUE - Download completo - {} ({})",
        state.name, state.uf
    );
    println!(
        "Doença: {} | Semanas {}-{} | Anos {}-{}",
        config.window.disease,
        config.window.ew_start,
        config.window.ew_end,
        config.window.ey_start,
        config.window.ey_end
    );
    println!("{border}");

    let directory = IbgeDirectory::new_ibge()
        .with_base_url(config.ibge_base_url.clone())
        .with_timeout(config.request_timeout);
    let municipalities = directory.resolve_municipalities(&state).await?;
    println!(
        "{} municípios encontrados via API IBGE",
        municipalities.len()
    );

    let provider = InfoDengueProvider::new_infodengue()
        .with_base_url(config.alert_base_url.clone())
        .with_timeout(config.request_timeout);
    let limiter = FixedDelayLimiter::new(config.delay);
    let driver = SweepDriver::new(provider, limiter);

    let output = driver.run(&municipalities, &config.window).await;

    let (rows, summary) = finalize(output)?;
    write_csv(&rows, &config.output_path)?;

    println!("{summary}");
    println!("Arquivo salvo: {}", config.output_path.display());

    Ok(())
}
