#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
    use task_calendar::{Planner, http_api};

    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let addr: SocketAddr = std::env::var("TASK_CALENDAR_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;
    let db_path =
        std::env::var("TASK_CALENDAR_DB").unwrap_or_else(|_| "task-calendar.db".to_string());

    println!("task-calendar HTTP API listening on http://{addr}");
    let planner = Planner::open(&db_path)?;
    http_api::serve(addr, planner).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
