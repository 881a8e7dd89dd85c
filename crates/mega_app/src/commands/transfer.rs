//! `mega transfer`: an unsigned MEGA transfer guarded by a post-condition.

use anyhow::{Context, Result};
use mega_client::{CallPayload, MegaClient};
use rust_decimal::Decimal;
use tracing::info;

use super::{Settings, print_json};

pub async fn run(
    settings: &Settings,
    amount: Decimal,
    sender: &str,
    recipient: &str,
    memo: Option<&str>,
) -> Result<()> {
    let client = settings.client()?;
    let payload = build(&client, amount, sender, recipient, memo).await?;

    info!(
        contract = %format!("{}.{}", payload.contract_address, payload.contract_name),
        function = %payload.function_name,
        "built transfer payload"
    );
    print_json(&payload)
}

/// The sender must send exactly the transferred amount, nothing more.
async fn build(
    client: &MegaClient,
    amount: Decimal,
    sender: &str,
    recipient: &str,
    memo: Option<&str>,
) -> Result<CallPayload> {
    client
        .transfer_with_post_condition(amount, sender, recipient, memo)
        .await
        .context("Failed to build transfer")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use mega_client::{ReadOnlyClient, ReadOnlyInvocation, RpcError};
    use mega_core::{ClarityValue, ClientConfig, PostCondition};

    const ALICE: &str = "SP143YHR805B8S834BWJTMZVFR1WP5FFC03WZE4BF";
    const BOB: &str = "SP20KK070RWJD7DJ8C8JVH1RKDMPVGP038MVVZVGW";

    /// Answers `get-decimals` with 6 and counts every call.
    #[derive(Default)]
    struct DecimalsNode {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReadOnlyClient for DecimalsNode {
        async fn call_read_only(&self, invocation: &ReadOnlyInvocation) -> Result<ClarityValue, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match invocation.function_name.as_str() {
                "get-decimals" => Ok(ClarityValue::ok(ClarityValue::uint(6u8))),
                other => Err(RpcError::Rejected { cause: format!("unexpected {other}") }),
            }
        }
    }

    #[tokio::test]
    async fn one_decimals_lookup_per_transfer() {
        let node = Arc::new(DecimalsNode::default());
        let client = MegaClient::with_rpc(ClientConfig::default(), node.clone()).unwrap();

        let payload = build(&client, Decimal::from(5), ALICE, BOB, None).await.unwrap();
        assert_eq!(node.calls.load(Ordering::SeqCst), 1);

        assert_eq!(payload.post_conditions.len(), 1);
        let PostCondition::Fungible(pc) = &payload.post_conditions[0];
        assert_eq!(pc.amount, 5_000_000);
        assert_eq!(pc.principal.to_string(), ALICE);
        assert_eq!(payload.arguments()[0], ClarityValue::uint(5_000_000u32));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["postConditions"][0]["amount"], "5000000");
    }
}
