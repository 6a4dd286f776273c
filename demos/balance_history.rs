//! Balance history example

use card_balance_core::utils::{init_logging, MemoryStorage};
use card_balance_core::{BalanceTracker, FixedClock, TrackerConfig};
use chrono::NaiveDate;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrackerConfig::from_toml_str(
        r#"
        max_batch_size = 500
        max_backfill_days = 365
        log_filter = "card_balance_core=debug"
        "#,
    )?;
    init_logging(&config);

    println!("💳 Card Balance Core - Balance History Example\n");

    let today = NaiveDate::from_ymd_opt(2023, 4, 16).ok_or("invalid date")?;
    let mut tracker = BalanceTracker::with_clock(MemoryStorage::new(), Arc::new(FixedClock(today)))
        .with_config(config);

    // 1. Register a user with two cards
    let user = tracker
        .create_user("Ada Lovelace".to_string(), "ada@example.com".to_string())
        .await?;
    tracker
        .add_credit_card(&user.id, "Chase".to_string(), "4111111111111111".to_string())
        .await?;
    tracker
        .add_credit_card(&user.id, "Amex".to_string(), "378282246310005".to_string())
        .await?;

    for card in tracker.get_all_cards_of_user(&user.id).await? {
        println!("  ✓ {} card {} for {}", card.issuance_bank, card.number, user.name);
    }
    println!();

    // 2. Submit an unordered batch; one card number is unknown
    let batch = r#"[
        {"creditCardNumber": "4111111111111111", "balanceDate": "2023-04-12", "balanceAmount": 1200},
        {"creditCardNumber": "4111111111111111", "balanceDate": "2023-04-10", "balanceAmount": 800},
        {"creditCardNumber": "378282246310005", "balanceDate": "2023-04-14", "balanceAmount": "310.25"},
        {"creditCardNumber": "6011000990139424", "balanceDate": "2023-04-13", "balanceAmount": 50}
    ]"#;

    let report = tracker.update_balances_json(batch).await?;
    println!("📥 {}\n", report.summary());

    // 3. A late correction shifts every later day by the same amount
    tracker
        .update_balances_json(
            r#"[{"creditCardNumber": "4111111111111111", "balanceDate": "2023-04-11", "balanceAmount": 1100}]"#,
        )
        .await?;

    println!("📈 History for 4111111111111111:");
    for entry in tracker.balance_history("4111111111111111").await? {
        println!("  {}  {}", entry.date, entry.balance);
    }
    println!();

    // 4. Point lookups
    let probe = NaiveDate::from_ymd_opt(2023, 4, 13).ok_or("invalid date")?;
    if let Some(entry) = tracker.closest_balance("378282246310005", probe).await? {
        println!("🔎 Closest Amex balance on or after {}: {} on {}", probe, entry.balance, entry.date);
    }
    if let Some(entry) = tracker.balance_as_of("378282246310005", probe).await? {
        println!("🔎 Amex balance as of {}: {}", probe, entry.balance);
    } else {
        println!("🔎 No Amex balance recorded as of {}", probe);
    }

    Ok(())
}
