#![cfg(not(tarpaulin_include))]

use financecontrol::config::AppConfig;
use financecontrol::downloader::facturas_to_csv;
use financecontrol::seed::SeedGenerator;
use financecontrol::store::DataStore;
use financecontrol::table::DataTable;
use financecontrol::viewer::{HELP, ViewerCommand, render_page};

use std::io::{self, Write};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let s = Instant::now();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: cli [<facturas> <users>]");
            return Ok(());
        }
    };

    let mut generator = SeedGenerator::new(config.seed);
    let store = DataStore::seeded(&mut generator, config.facturas, config.users);
    let mut table = DataTable::default();

    let mut start_time = Instant::now();
    let mut status = String::from("ok");
    let mut show = true;
    loop {
        let view = table.view(store.facturas());
        if show {
            println!("{}", render_page(&view));
        }

        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        start_time = Instant::now();

        let Some(command) = ViewerCommand::parse(&line) else {
            status = String::from("invalid command");
            continue;
        };

        status = String::from("ok");
        match command {
            ViewerCommand::Quit => break,
            ViewerCommand::Help => println!("{}", HELP),
            ViewerCommand::DisableOutput => show = false,
            ViewerCommand::EnableOutput => show = true,
            ViewerCommand::Export(path) => {
                let csv = facturas_to_csv(&view.current_data)?;
                match std::fs::write(&path, csv) {
                    Ok(()) => status = format!("{} faturas exportadas", view.current_data.len()),
                    Err(e) => status = format!("export failed: {}", e),
                }
            }
            other => {
                other.apply(&mut table);
            }
        }
    }

    println!("Total elapsed time: {:.1} seconds", s.elapsed().as_secs_f64());
    Ok(())
}
