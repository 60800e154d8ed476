//! `medgate doctor` - check configuration, credentials and connectivity

use crate::server::config::ProviderConfig;
use crate::server::{build_router, load_config, validate_config};
use medgate_llm::util::mask_api_key;
use medgate_llm::Error;

pub async fn run() -> anyhow::Result<()> {
    println!("🏥 medgate doctor\n");

    print!("Checking configuration... ");
    let config = match load_config().and_then(|c| validate_config(&c).map(|()| c)) {
        Ok(config) => {
            println!("✅ {} providers", config.llm.providers.len());
            config
        }
        Err(e) => {
            println!("❌ {:#}", e);
            std::process::exit(1);
        }
    };

    let env = |var: &str| std::env::var(var).ok();
    let mut credentials = 0;
    for provider in &config.llm.providers {
        if print_credential(provider, env) {
            credentials += 1;
        }
    }

    let router = build_router(&config.llm)?;
    let mut reachable = 0;
    println!();
    for provider in &config.llm.providers {
        print!("Probing {}... ", provider.name);
        match router.probe_provider(&provider.name).await {
            Ok(models) => {
                reachable += 1;
                let missing: Vec<&str> = provider
                    .models
                    .iter()
                    .map(|m| m.name.as_str())
                    .filter(|name| !models.iter().any(|listed| listed == name))
                    .collect();
                if models.is_empty() || missing.is_empty() {
                    println!("✅ reachable");
                } else {
                    println!("⚠️  reachable, not listed: {}", missing.join(", "));
                }
            }
            Err(Error::NotConfigured(_)) => println!("⏭️  skipped (no credential)"),
            Err(e) => println!("❌ {}", e),
        }
    }

    println!();
    if credentials == 0 {
        println!("⚠️  No provider has a credential. Set at least one *_API_KEY variable.");
        std::process::exit(1);
    } else if reachable == 0 {
        println!("⚠️  No provider is reachable.");
        std::process::exit(1);
    }
    println!("✅ {reachable} of {credentials} configured providers reachable.");
    Ok(())
}

/// Print the credential line of one provider, returning whether a key is set
fn print_credential(provider: &ProviderConfig, env: impl Fn(&str) -> Option<String>) -> bool {
    println!("{}", credential_line(provider, &env));
    env(&provider.api_key_var()).is_some_and(|k| !k.trim().is_empty())
}

fn credential_line(provider: &ProviderConfig, env: &impl Fn(&str) -> Option<String>) -> String {
    let key_var = provider.api_key_var();
    let mut line = match env(&key_var).filter(|k| !k.trim().is_empty()) {
        Some(key) => format!("  ✅ {} ({}={})", provider.name, key_var, mask_api_key(key.trim())),
        None => format!("  ⚠️  {} ({} not set)", provider.name, key_var),
    };
    let limit_var = provider.daily_limit_var();
    if let Some(limit) = env(&limit_var).filter(|v| !v.trim().is_empty()) {
        line.push_str(&format!(", daily limit {}={}", limit_var, limit.trim()));
    } else if provider.daily_limit > 0 {
        line.push_str(&format!(", daily limit {}", provider.daily_limit));
    }
    line
}
