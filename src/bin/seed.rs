use chrono::{Duration, Utc};
use clap::Parser;
use fake::{
    faker::{internet::en::SafeEmail, name::en::Name},
    Fake,
};
use rand::{seq::SliceRandom, Rng};
use tripdesk::{
    config::Settings,
    db,
    domain::{CreateUserRequest, NewTrip, Role, SeatInventory},
    repository::{
        SqliteTripRepository, SqliteUserRepository, TripRepository, UserRepository,
    },
};

const CITIES: &[&str] = &[
    "Mumbai", "Pune", "Bengaluru", "Hyderabad", "Chennai", "Delhi", "Jaipur", "Goa",
    "Ahmedabad", "Kochi",
];

const DEPARTURES: &[&str] = &["06:00", "08:30", "11:15", "14:00", "17:45", "21:30", "23:00"];

/// Fills a database with sample users and trips.
#[derive(Parser, Debug)]
#[command(name = "seed", about = "Seed the Tripdesk database with sample data")]
struct Args {
    /// Database URL; defaults to the configured one.
    #[arg(long)]
    database_url: Option<String>,

    /// Number of regular users to create.
    #[arg(long, default_value_t = 5)]
    users: usize,

    /// Number of trips to create.
    #[arg(long, default_value_t = 20)]
    trips: usize,

    /// Password given to every seeded user.
    #[arg(long, default_value = "password123")]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut settings = Settings::new().unwrap_or_default();
    if let Some(url) = args.database_url {
        settings.database.url = url;
    }

    println!("Seeding {}", settings.database.url);
    let db_pool = db::connect(&settings.database).await?;

    let user_repo = SqliteUserRepository::new(db_pool.clone());
    let trip_repo = SqliteTripRepository::new(db_pool.clone());

    if user_repo.find_by_email(&settings.auth.default_admin_email).await?.is_none() {
        user_repo
            .create(CreateUserRequest {
                name: settings.auth.default_admin_name.clone(),
                email: settings.auth.default_admin_email.clone(),
                password: settings.auth.default_admin_password.clone(),
                role: Role::Admin,
            })
            .await?;
        println!("  created admin {}", settings.auth.default_admin_email);
    }

    let mut created_users = 0;
    for _ in 0..args.users {
        let email: String = SafeEmail().fake();
        if user_repo.find_by_email(&email).await?.is_some() {
            continue;
        }
        user_repo
            .create(CreateUserRequest {
                name: Name().fake(),
                email,
                password: args.password.clone(),
                role: Role::User,
            })
            .await?;
        created_users += 1;
    }
    println!("  created {} users (password: {})", created_users, args.password);

    let mut rng = rand::thread_rng();
    let today = Utc::now().date_naive();

    for _ in 0..args.trips {
        let mut route = CITIES.choose_multiple(&mut rng, 2);
        let (Some(origin), Some(destination)) = (route.next(), route.next()) else {
            continue;
        };

        let total_seats = *[30, 36, 40, 45].choose(&mut rng).unwrap_or(&40);
        let time = DEPARTURES.choose(&mut rng).unwrap_or(&"08:30");

        trip_repo
            .create(NewTrip {
                origin: origin.to_string(),
                destination: destination.to_string(),
                date: today + Duration::days(rng.gen_range(1..=60)),
                time: time.to_string(),
                inventory: SeatInventory::new(total_seats)?,
                price_cents: rng.gen_range(30..=250) * 1000,
                image: None,
            })
            .await?;
    }
    println!("  created {} trips", args.trips);

    println!("Done.");
    Ok(())
}
