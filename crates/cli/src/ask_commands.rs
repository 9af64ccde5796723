//! One-shot commands that exercise the assistant without Telegram.

use {
    anyhow::Result,
    onika_chat::{AssistantService, StatusReport},
    onika_common::RequesterId,
    onika_config::OnikaConfig,
};

fn requester() -> RequesterId {
    RequesterId::from("cli")
}

pub async fn generate(config: &OnikaConfig, topic: &str) -> Result<()> {
    let service = AssistantService::from_config(config)?;
    let artifact = service.generate_from_topic(&requester(), topic).await?;
    println!("{}\n", artifact.text);
    println!("topic: {}", artifact.topic);
    println!("backend: {} ({})", artifact.backend_label, artifact.backend_id);
    if !artifact.sources.is_empty() {
        println!("sources: {}", artifact.sources.len());
    }
    if let Some(location) = artifact.location {
        println!("saved: {location}");
    }
    Ok(())
}

pub async fn search(config: &OnikaConfig, query: &str) -> Result<()> {
    let service = AssistantService::from_config(config)?;
    let results = service.search(query).await?;
    if results.is_empty() {
        println!("No results.");
    }
    for (i, r) in results.iter().enumerate() {
        println!("{}. {}\n   {}", i + 1, r.title, r.url);
        if !r.description.is_empty() {
            println!("   {}", r.description);
        }
    }
    Ok(())
}

pub fn status(config: &OnikaConfig) -> Result<()> {
    let service = AssistantService::from_config(config)?;
    print!("{}", render_status(&service.status()));
    Ok(())
}

fn render_status(report: &StatusReport) -> String {
    let mut out = String::new();
    for (i, b) in report.backends.iter().enumerate() {
        out.push_str(&format!(
            "Layer {} {:<12} {:<24} {}\n",
            i + 1,
            b.id,
            b.label,
            if b.configured { "ready" } else { "not configured" }
        ));
    }
    let on_off = |on: bool| if on { "on" } else { "off" };
    out.push_str(&format!("search: {}\n", on_off(report.search_available)));
    out.push_str(&format!("voice:  {}\n", on_off(report.voice_available)));
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lists_layers_in_failover_order() {
        let service = AssistantService::from_config(&OnikaConfig::default()).unwrap();
        let report = service.status();
        let text = render_status(&report);
        let first = &report.backends[0];
        assert!(text.starts_with(&format!("Layer 1 {:<12}", first.id)));
        assert_eq!(
            text.lines().filter(|l| l.starts_with("Layer ")).count(),
            report.backends.len()
        );
        assert!(text.contains("search: "));
    }
}
