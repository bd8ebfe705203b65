// ============================================================================
// Basic Usage Example
// ============================================================================

use double_auction::numeric::Price;
use double_auction::prelude::*;
use std::sync::Arc;

fn main() {
    #[cfg(feature = "logging")]
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Double Auction Example ===\n");

    // Clearing house: orders accumulate, the book clears every 2 rounds
    let handler = Arc::new(RecordingEventHandler::new());
    let mut auctioneer = AuctioneerBuilder::clearing_house("widgets", 2)
        .with_rounds_per_day(2)
        .with_max_days(2)
        .build(handler.clone())
        .unwrap();

    println!("Created clearing house for widgets\n");

    for round in 0i64..4 {
        println!("Round {}:", round + 1);

        // Sellers ask from 95 upwards
        for i in 0i64..3 {
            let ask = Order::ask(
                AgentId((round * 10 + i) as u64),
                Price::from_whole(95 + i * 5).unwrap(),
                2,
            )
            .unwrap();
            auctioneer.submit(ask).unwrap();
        }

        // Buyers bid from 110 downwards
        for i in 0i64..3 {
            let bid = Order::bid(
                AgentId((round * 10 + 5 + i) as u64),
                Price::from_whole(110 - i * 5).unwrap(),
                1 + i as u32,
            )
            .unwrap();
            auctioneer.submit(bid).unwrap();
        }

        let quote = auctioneer.quote();
        println!("  quote: bid {:?} / ask {:?}", quote.bid, quote.ask);
        println!("  matched volume: {}", auctioneer.book().matched_volume());

        for event in auctioneer.end_round().unwrap() {
            match event {
                MarketEvent::Transaction { transaction, .. } => println!(
                    "  trade: {} -> {} {} @ {}",
                    transaction.seller, transaction.buyer, transaction.quantity, transaction.price
                ),
                MarketEvent::DayClosed { day, .. } => println!("  day {} closed", day),
                MarketEvent::AuctionClosed { round, .. } => {
                    println!("  auction closed after round {}", round)
                },
                _ => {},
            }
        }
    }

    println!("\n=== Resting Orders ===");
    println!("\nBids:");
    for fragment in auctioneer.book().unmatched_bids() {
        println!("  {} @ {}", fragment.quantity(), fragment.price());
    }
    println!("\nAsks:");
    for fragment in auctioneer.book().unmatched_asks() {
        println!("  {} @ {}", fragment.quantity(), fragment.price());
    }

    println!("\nTotal transactions: {}", handler.transactions().len());
}
