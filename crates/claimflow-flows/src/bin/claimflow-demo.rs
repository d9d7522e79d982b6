//! Runs the claim protocol between two in-process nodes.
//!
//! ```text
//! claimflow-demo [CONFIG.json] [--json]
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::sync::Arc;

use claimflow_flows::{HolderFlow, MemoryNetwork, NodeServices, spawn_responder};
use claimflow_ledger::{
    ClaimContract, InMemoryNotary, InMemoryVault, Notary,
    asset_ops::{distribute, issue_asset, update_asset},
};
use claimflow_types::{AssetState, FlowConfig, Identity, LinearId, Result, constants};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    init_tracing(args.iter().any(|a| a == "--json"));

    let config = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => FlowConfig::load(path)?,
        None => FlowConfig::default(),
    };
    config.validate()?;
    tracing::info!(
        protocol = constants::PROTOCOL_NAME,
        version = constants::VERSION,
        session_timeout_ms = config.session_timeout_ms,
        finality_timeout_ms = config.finality_timeout_ms,
        "Starting demo"
    );

    let network = MemoryNetwork::new(config.clone());
    let notary = Arc::new(InMemoryNotary::new(Identity::generate("Notary")));

    let issuer_id = Identity::generate("AcmeIssuer");
    let issuer_vault = Arc::new(InMemoryVault::new(issuer_id.party().clone()));
    let holder_id = Identity::generate("Alice");
    let holder_vault = Arc::new(InMemoryVault::new(holder_id.party().clone()));

    let acme = AssetState {
        linear_id: LinearId::new(),
        symbol: "ACME".into(),
        name: "Acme Corp".into(),
        issuer: issuer_id.party().clone(),
        yield_rate: Decimal::new(25, 3),
        currency: "USD".into(),
        fraction_digits: 0,
    };
    let issued = issue_asset(
        &issuer_id,
        &*issuer_vault,
        &ClaimContract,
        &*notary,
        acme.clone(),
    )
    .await?;
    distribute(&issued, &*issuer_vault, &*holder_vault)?;
    holder_vault.set_holding(&acme.pointer(), 100)?;

    let inbox = network.register(issuer_id.party()).await;
    let issuer = NodeServices::new(
        issuer_id,
        issuer_vault.clone(),
        notary.clone(),
        network.clone(),
        config.clone(),
    );
    let holder = NodeServices::new(holder_id, holder_vault.clone(), notary.clone(), network, config);
    let mut responder = spawn_responder(issuer.clone(), inbox);

    // Matching views: a claim of trunc(100 x 0.025) = 2 USD minor units.
    match HolderFlow::new(holder.clone(), "ACME").run().await {
        Ok(tx) => tracing::info!(tx = %tx, claims = holder_vault.claims()?.len(), "Claim accepted"),
        Err(err) => tracing::error!(error = %err, "Claim failed"),
    }
    let _ = responder.next_outcome().await;

    // The issuer moves the asset on without telling the holder.
    update_asset(
        &issuer.identity,
        &*issuer_vault,
        &ClaimContract,
        &*notary,
        &acme.pointer(),
        |a| a.yield_rate = Decimal::new(30, 3),
    )
    .await?;
    match HolderFlow::new(holder, "ACME").run().await {
        Ok(tx) => tracing::error!(tx = %tx, "Stale claim unexpectedly accepted"),
        Err(err) => tracing::info!(error = %err, "Stale claim refused"),
    }
    if let Some(outcome) = responder.next_outcome().await {
        tracing::info!(
            holder = %outcome.holder,
            ok = outcome.result.is_ok(),
            "Issuer run finished"
        );
    }

    tracing::info!(
        notary = %notary.party(),
        finalized = notary.committed_count()?,
        issuer_claims = issuer_vault.claims()?.len(),
        holder_claims = holder_vault.claims()?.len(),
        "Demo complete"
    );
    responder.abort();
    Ok(())
}
