#[macro_use]
extern crate clap;
extern crate wallet_core_lib;

use clap::App;

fn main() {
    let yaml = load_yaml!("cli.yml");
    let mut app = App::from_yaml(yaml);
    let matches = app.clone().get_matches();

    if let Some(_) = matches.subcommand_matches("config") {
        wallet_core_lib::print_config();
    } else if let Some(matches) = matches.subcommand_matches("watcher") {
        let coin = matches.value_of("coin").unwrap_or_default();
        wallet_core_lib::start_watcher(coin);
    } else if let Some(_) = matches.subcommand_matches("sweeper") {
        wallet_core_lib::start_sweeper();
    } else {
        let _ = app.print_help();
        println!("\n")
    }
}
