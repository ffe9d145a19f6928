use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use offer_desk::core::{Direction, Field, OrderBookFilter};
use offer_desk::submission::Dispatch;
use offer_desk::{Config, OfferSession, PaperWallet};

const HELP: &str = "commands: amount <x> | min <x> | price <x> | volume <x> | place | show | json | help | quit";

/// offer-desk [buy|sell] [amount] [price]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();

    // 1. Logger (RUST_LOG wins over the configured level)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},offer_desk=info", config.app.log_level)));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    tracing::info!("Offer desk starting...");

    // 2. Session, optionally seeded from the command line like an order-book filter
    let args: Vec<String> = std::env::args().skip(1).collect();
    let direction = match args.first().map(|s| s.to_ascii_lowercase()).as_deref() {
        None | Some("buy") => Direction::Buy,
        Some("sell") => Direction::Sell,
        Some(other) => anyhow::bail!("unknown direction {:?}, expected buy or sell", other),
    };
    let seed = OrderBookFilter {
        direction,
        amount: args.get(1).and_then(|s| s.parse::<Decimal>().ok()),
        price: args.get(2).and_then(|s| s.parse::<Decimal>().ok()),
    };

    let wallet = Arc::new(PaperWallet::from_config(&config)?.with_latency(Duration::from_millis(300)));
    let mut session =
        OfferSession::with_filter(&seed, config.policy()?, config.terms.clone(), wallet)?;

    println!("{}", HELP);
    print_table(&session);

    // 3. Command loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let arg = parts.collect::<Vec<_>>().join(" ");

        let field = match command {
            "amount" => Some(Field::Amount),
            "min" => Some(Field::MinAmount),
            "price" => Some(Field::Price),
            "volume" => Some(Field::Volume),
            _ => None,
        };
        if let Some(field) = field {
            let cascade = session.commit(field, &arg);
            for (f, warning) in &cascade.warnings {
                println!("  ! {}: {}", f, warning);
            }
            print_table(&session);
            continue;
        }

        match command {
            "place" => match session.place_offer() {
                Dispatch::Dispatched => {
                    println!("Publishing...");
                    let state = session.next_submission_event().await;
                    println!("{}", serde_json::to_string(state)?);
                    if let Some(tx) = session.submission().transaction_id() {
                        println!("Offer published. Transaction: {}", tx);
                        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
                        break;
                    }
                }
                other => println!("Not placed: {:?}", other),
            },
            "show" => print_table(&session),
            "json" => println!("{}", serde_json::to_string_pretty(&session.view())?),
            "help" => println!("{}", HELP),
            "quit" | "exit" => break,
            other => println!("unknown command {:?}; {}", other, HELP),
        }
    }

    tracing::info!("Offer desk stopped");
    Ok(())
}

fn print_table(session: &OfferSession) {
    let policy = session.policy();
    println!("{} {}", session.direction_label(), session.payment_label());
    println!("  address      {}", session.address_text());
    println!(
        "  payment      {} ({}, {})",
        session.bank_account_type(),
        session.bank_account_currency(),
        session.bank_account_country()
    );
    println!("  countries    {}", session.accepted_countries_text());
    println!("  languages    {}", session.accepted_languages_text());
    for field in Field::ALL {
        let display = session.fields().get(field);
        let code = match field {
            Field::Amount | Field::MinAmount => &policy.base_asset_code,
            Field::Price | Field::Volume => &policy.fiat_code,
        };
        let status = match display.message() {
            Some(message) => format!("  <- {}", message),
            None => String::new(),
        };
        println!("  {:<12} {:>16} {}{}", field.to_string(), display.text(), code, status);
    }
    println!("  {:<22} {}", session.collateral_label(), session.fields().collateral());
    println!("  {:<22} {}", "Fees:", session.fields().total_fees());
    println!("  {:<22} {}", "Total to pay:", session.fields().total_to_pay());
    if let Some(message) = session.submission().error_message() {
        println!("  request failed: {}", message);
    }
}
