//! Read-only subcommands. Each prints one JSON document to stdout.

use anyhow::Result;
use mega_core::from_base_units;
use serde_json::json;
use tracing::debug;

use super::{Settings, print_json};

/// `mega info`
pub async fn info(settings: &Settings) -> Result<()> {
    let client = settings.client()?;

    let decimals = client.get_decimals().await?;
    let total_supply = client.get_total_supply().await?;
    debug!(decimals, total_supply, "fetched token basics");

    print_json(&json!({
        "network": client.network(),
        "apiUrl": client.api_url(),
        "token": {
            "name": client.get_name().await?,
            "symbol": client.get_symbol().await?,
            "decimals": decimals.to_string(),
            "totalSupply": total_supply.to_string(),
            "tokenUri": client.get_token_uri().await?,
        },
        "vault": {
            "stxBalance": client.get_vault_balance().await?.to_string(),
            "megaBalance": client.get_balance_of_token(None).await?.to_string(),
        },
        "submission": {
            "proposeThreshold": client.get_token_threshold().await?.to_string(),
            "proposalDuration": client.get_proposal_duration().await?.to_string(),
            "minimumProposalStartDelay": client.get_minimum_start_delay().await?.to_string(),
            "maximumProposalStartDelay": client.get_maximum_start_delay().await?.to_string(),
        },
        "voting": {
            "voteThreshold": client.get_vote_threshold().await?.to_string(),
            "quorumThreshold": client.get_quorum_threshold().await?.to_string(),
            "executionDelay": client.get_execution_delay().await?.to_string(),
        },
    }))
}

/// `mega balance <who>`
pub async fn balance(settings: &Settings, who: &str) -> Result<()> {
    let client = settings.client()?;
    let units = client.get_token_balance(who).await?;
    let decimals = u32::try_from(client.get_decimals().await?)?;

    print_json(&json!({
        "address": who,
        "balance": units.to_string(),
        "formatted": from_base_units(units, decimals)?.to_string(),
        "isDelegating": client.is_delegating(who).await?,
        "canPropose": client.can_propose(who).await?,
    }))
}

/// `mega proposal <proposal>`
pub async fn proposal(settings: &Settings, proposal: &str) -> Result<()> {
    let client = settings.client()?;
    let data = client.get_proposal(proposal).await?;
    let executed_at = client.executed_at(proposal).await?;

    print_json(&json!({
        "proposal": proposal,
        "data": data,
        "executedAt": executed_at.map(|h| h.to_string()),
    }))
}

/// `mega voting-power <who> --block-height <n>`
pub async fn voting_power(settings: &Settings, who: &str, block_height: u128) -> Result<()> {
    let client = settings.client()?;
    let power = client.get_voting_power(who, block_height).await?;
    let threshold = client.get_vote_threshold().await?;
    let can_vote = client.can_vote(who, block_height, threshold).await?;

    print_json(&json!({
        "address": who,
        "blockHeight": block_height.to_string(),
        "votingPower": power.map(|p| p.to_string()),
        "canVote": can_vote,
    }))
}
