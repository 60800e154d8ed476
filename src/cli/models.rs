//! `medgate models` - print the model catalogue with live availability

use medgate_llm::{ModelAvailability, ProviderStatus};

pub async fn run() -> anyhow::Result<()> {
    let router = super::load_router()?;
    let models = router.list_models_with_availability().await;
    let providers = router.provider_status().await;

    print!("{}", render_models(&models));
    println!();
    print!("{}", render_providers(&providers));
    Ok(())
}

fn render_models(models: &[ModelAvailability]) -> String {
    let width = models
        .iter()
        .map(|m| m.model.len())
        .max()
        .unwrap_or(5)
        .max(5);
    let mut out = format!(
        "{:<12} {:<width$} {:>8} {:<7} {}\n",
        "PROVIDER", "MODEL", "PRIORITY", "KIND", "STATUS"
    );
    for m in models {
        let status = match m.skip_reason {
            None => "✅ available".to_string(),
            Some(reason) => format!("⚠️  {}", reason.as_str()),
        };
        out.push_str(&format!(
            "{:<12} {:<width$} {:>8} {:<7} {}\n",
            m.provider,
            m.model,
            m.priority,
            m.capability.as_str(),
            status
        ));
    }
    out
}

fn render_providers(providers: &[ProviderStatus]) -> String {
    let mut out = String::new();
    for p in providers {
        let limit = if p.daily_limit == 0 {
            "unlimited".to_string()
        } else {
            p.daily_limit.to_string()
        };
        out.push_str(&format!(
            "{}: {} / {} tokens today, {} ok, {} failed",
            p.name, p.used_today, limit, p.successes_today, p.failures_today
        ));
        if let Some(until) = p.blocked_until {
            out.push_str(&format!(
                ", blocked until {} ({})",
                until.format("%Y-%m-%d %H:%M"),
                p.block_reason.as_deref().unwrap_or("unknown")
            ));
        }
        out.push('\n');
    }
    out
}
