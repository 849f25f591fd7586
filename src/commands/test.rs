//! Test command implementation.
//!
//! Fetches every configured registry once and displays results.

use ahash::AHashMap as HashMap;
use eureka_exporter::{Config, EurekaClient, LabelSchema, RegistryFetch};
use std::time::Instant;

/// Fetches every target once. Fails if any target could not be fetched.
pub async fn command_test(verbose: bool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🧪 Eureka Exporter - Test Mode");
    println!("==============================");

    let client = EurekaClient::new(config.request_timeout())?;
    let schema = LabelSchema::new(&config.metadata);
    let targets = config.targets();
    let mut failed = 0usize;

    for target in &targets {
        println!("\n🔄 {} ({})", target.name, target.apps_url());

        let start = Instant::now();
        let snapshot = match client.fetch(target).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                failed += 1;
                println!("   ❌ Fetch failed: {}", e);
                continue;
            }
        };
        println!(
            "   ⏱️  Fetch duration: {:.2}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
        println!("   📊 Instances: {}", snapshot.len());

        if verbose {
            for record in &snapshot {
                let tuple = schema.tuple(target, record);
                println!("   ├─ {} @ {}", record.app, record.host_name);
                println!("   │  ├─ Status: {}", record.status);
                for (key, value) in schema.metadata_keys().iter().zip(&tuple.extra) {
                    println!("   │  ├─ {}: {}", key, value);
                }
                println!("   │  └─ Instance ID: {}", record.instance_id);
            }
        } else {
            let mut per_status: HashMap<&str, usize> = HashMap::new();
            for record in &snapshot {
                *per_status.entry(record.status.as_str()).or_insert(0) += 1;
            }
            let mut statuses: Vec<_> = per_status.into_iter().collect();
            statuses.sort();
            for (status, count) in statuses {
                println!("   ├─ {}: {}", status, count);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} targets could not be fetched", failed, targets.len()).into());
    }

    println!("\n✅ Test completed successfully");
    Ok(())
}
