use clap::Subcommand;

use chronofocus_core::{Monster, MonsterCatalog};

#[derive(Subcommand)]
pub enum MonstersAction {
    /// Print the monster catalog as JSON
    List,
}

pub fn run(action: MonstersAction) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = MonsterCatalog::load()?;
    match action {
        MonstersAction::List => {
            let monsters: Vec<&Monster> = catalog.all().collect();
            println!("{}", serde_json::to_string_pretty(&monsters)?);
        }
    }
    Ok(())
}
