//! Seeds the reference data a fresh deployment needs: the campus exchange
//! points, plus a demo account and sample listings for local development.
//! Safe to re-run; existing rows are left alone.

use campus_exchange::util::net_id_from_email;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::info;
use uuid::Uuid;

const EXCHANGE_POINTS: &[(&str, &str, &str, &str, f64, f64)] = &[
    (
        "Illini Union - Main Lobby",
        "1401 W Green St, Urbana, IL",
        "Central campus location with high foot traffic. Security present during business hours.",
        "Central Campus",
        40.1092,
        -88.2272,
    ),
    (
        "Undergraduate Library (UGL)",
        "1402 W Gregory Dr, Urbana, IL",
        "Open late hours. Well-lit and heavily monitored area.",
        "Central Campus",
        40.1047,
        -88.2289,
    ),
    (
        "Grainger Engineering Library",
        "1301 W Springfield Ave, Urbana, IL",
        "Engineering quad location. Ideal for textbook exchanges.",
        "Engineering Campus",
        40.1125,
        -88.2269,
    ),
    (
        "SDRP (Student Dining & Residential Programs)",
        "301 E Gregory Dr, Champaign, IL",
        "ISR area. Good for south campus residents.",
        "South Campus",
        40.1071,
        -88.2183,
    ),
    (
        "Ikenberry Commons",
        "1101 W Peabody Dr, Urbana, IL",
        "Six Pack dorms area. Great for freshmen exchanges.",
        "Ikenberry",
        40.1002,
        -88.2293,
    ),
    (
        "FAR/PAR Commons",
        "1213 S Fourth St, Champaign, IL",
        "Far south campus. Good for FAR/PAR residents.",
        "South Campus",
        40.0989,
        -88.2172,
    ),
    (
        "Campus Recreation Center East (CRCE)",
        "1102 W Gregory Dr, Urbana, IL",
        "Gym location. Popular evening meetup spot.",
        "Central Campus",
        40.1043,
        -88.2194,
    ),
    (
        "Main Library",
        "1408 W Gregory Dr, Urbana, IL",
        "Main quad location. Historic and safe meeting point.",
        "Central Campus",
        40.1047,
        -88.2289,
    ),
    (
        "State Farm Center",
        "1800 S First St, Champaign, IL",
        "South campus arena. Good for large item exchanges.",
        "South Campus",
        40.0966,
        -88.2358,
    ),
    (
        "Green Street Coffee Shop Area",
        "Green St, Champaign, IL",
        "Multiple cafes available. Casual meetup spot.",
        "Campustown",
        40.1102,
        -88.2282,
    ),
];

const SAMPLE_LISTINGS: &[(&str, &str, f64, &str, &str)] = &[
    (
        "Calculus Textbook - Stewart 8th Edition",
        "Barely used calculus textbook. Some highlighting but otherwise in great condition. Perfect for MATH 241.",
        45.00,
        "textbooks",
        "like_new",
    ),
    (
        "Mini Fridge - Perfect for Dorms",
        "Compact mini fridge, works perfectly. Moving out and need to sell. Includes small freezer compartment.",
        75.00,
        "furniture",
        "good",
    ),
    (
        "MacBook Charger 60W MagSafe",
        "Original Apple charger. Works with older MacBook Pro models. Minor cosmetic wear.",
        25.00,
        "electronics",
        "fair",
    ),
    (
        "Schwinn Road Bike 21-Speed",
        "Great commuter bike for getting around campus. Recently tuned up. Includes lock!",
        150.00,
        "transportation",
        "good",
    ),
];

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    run().await
}

async fn run() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    std::env::set_var(
        "RUST_LOG",
        std::env::var("RUST_LOG").unwrap_or_else(|_| String::from("info")),
    );

    // initialize tracing
    tracing_subscriber::fmt::init();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    seed_exchange_points(&pool).await?;
    let demo_user = seed_demo_user(&pool).await?;
    seed_sample_listings(&pool, demo_user).await?;

    info!("Seeding complete");

    Ok(())
}

async fn seed_exchange_points(pool: &PgPool) -> color_eyre::Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exchange_points")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!("Exchange points already present, skipping");
        return Ok(());
    }

    for (name, location, description, zone, latitude, longitude) in EXCHANGE_POINTS {
        sqlx::query(
            "INSERT INTO exchange_points (id, name, location, description, zone, latitude, longitude) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(location)
        .bind(description)
        .bind(zone)
        .bind(latitude)
        .bind(longitude)
        .execute(pool)
        .await?;
    }

    info!("Inserted {} exchange points", EXCHANGE_POINTS.len());
    Ok(())
}

async fn seed_demo_user(pool: &PgPool) -> color_eyre::Result<Uuid> {
    let email = "demo@illinois.edu";

    if let Some(id) =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?
    {
        info!("Demo user already present, skipping");
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, email, net_id, name, is_verified, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, TRUE, NOW(), NOW())",
    )
    .bind(id)
    .bind(email)
    .bind(net_id_from_email(email))
    .bind("Demo User")
    .execute(pool)
    .await?;

    info!("Demo user created ({email})");
    Ok(id)
}

async fn seed_sample_listings(pool: &PgPool, seller_id: Uuid) -> color_eyre::Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!("Listings already present, skipping");
        return Ok(());
    }

    let points: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM exchange_points ORDER BY name")
        .fetch_all(pool)
        .await?;

    for (i, (title, description, price, category, condition)) in
        SAMPLE_LISTINGS.iter().enumerate()
    {
        let images = vec![String::from("/uploads/sample-listing.jpg")];
        sqlx::query(
            "INSERT INTO listings (id, seller_id, title, description, price, category, \
             condition_status, exchange_point_id, images, status, views, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active', 0, NOW(), NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(category)
        .bind(condition)
        .bind(points.get(i % points.len().max(1)).copied())
        .bind(Json(images))
        .execute(pool)
        .await?;
    }

    info!("Inserted {} sample listings", SAMPLE_LISTINGS.len());
    Ok(())
}
