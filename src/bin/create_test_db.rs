use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use rusqlite::Connection;
use time::OffsetDateTime;

use finance_tracker::{
    PasswordHash, create_user, initialize_db,
    ledger::{NewBudget, create_budget, create_demo_data, get_categories},
    report::Cadence,
};

/// A utility for creating a database filled with demo data for manual testing.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// Seed for the random demo data.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path
        .extension()
        .is_none_or(|extension| extension.is_empty())
    {
        eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let connection = Connection::open(output_path)?;
    initialize_db(&connection)?;

    println!("Creating test user \"test\" with the password \"test\"...");
    // Skips the strength check so the test password can stay short.
    let password_hash =
        PasswordHash::new_unchecked(&bcrypt::hash("test", PasswordHash::DEFAULT_COST)?);
    let user = create_user("test", password_hash, &connection)?;

    println!("Creating demo accounts and transactions...");
    let today = OffsetDateTime::now_utc().date();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let demo_data = create_demo_data(user.id, today, &mut rng, &connection)?;

    let category_ids = get_categories(user.id, &connection)?
        .into_iter()
        .filter(|category| matches!(category.name.as_str(), "Groceries" | "Dining"))
        .map(|category| category.id)
        .collect();
    create_budget(
        user.id,
        NewBudget {
            name: "Food".to_owned(),
            cadence: Cadence::Monthly,
            category_ids,
            cap: 600.into(),
            start: today.replace_day(1)?,
        },
        today,
        &connection,
    )?;

    println!(
        "Success! Created {} transactions and one budget.",
        demo_data.transactions_made
    );

    Ok(())
}
