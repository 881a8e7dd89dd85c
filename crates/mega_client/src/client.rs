use std::sync::Arc;

use mega_core::{
    AssetInfo, ClarityValue, ClientConfig, ContractKey, FungibleConditionCode, Network, Principal,
    ResponseResult, ValueError, fungible_post_condition, to_base_units, value::take_field,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ClientError, ErrorScope, LowerError, translate_error};
use crate::facade::{CallPayload, DeployedContract};
use crate::rpc::{HttpReadOnlyClient, ReadOnlyClient};

/// Asset used by the vault helpers when none is given.
pub const DEFAULT_ASSET_CONTRACT: &str = "SP3D6PV2ACBPEKYJTCMH7HEN02KP87QSP8KTEH335.mega";

/// Most votes `vote-many` accepts in one call.
pub const MAX_VOTES: usize = 100;

/// One entry of a [`MegaClient::vote_many`] batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEntry {
    #[serde(rename = "for")]
    pub is_for: bool,
    pub proposal: String,
    #[serde(default)]
    pub delegator: Option<String>,
}

/// State of a proposal as recorded by the voting contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalData {
    pub concluded: bool,
    pub passed: bool,
    pub proposer: Principal,
    pub start_block_height: u128,
    pub end_block_height: u128,
    pub votes_for: u128,
    pub votes_against: u128,
}

impl ProposalData {
    fn from_value(value: ClarityValue) -> Result<Self, ValueError> {
        let mut fields = value.expect_tuple()?;
        Ok(Self {
            concluded: take_field(&mut fields, "concluded")?.expect_bool()?,
            passed: take_field(&mut fields, "passed")?.expect_bool()?,
            proposer: take_field(&mut fields, "proposer")?.expect_principal()?,
            start_block_height: take_field(&mut fields, "startBlockHeight")?.expect_u128()?,
            end_block_height: take_field(&mut fields, "endBlockHeight")?.expect_u128()?,
            votes_for: take_field(&mut fields, "votesFor")?.expect_u128()?,
            votes_against: take_field(&mut fields, "votesAgainst")?.expect_u128()?,
        })
    }
}

/// Typed access to the mega-dao contracts on one network.
///
/// Read-only methods evaluate a query through the configured
/// [`ReadOnlyClient`]. Call methods return a [`CallPayload`] for an external
/// signer and never touch the network, except [`MegaClient::transfer`],
/// which first reads the token's decimals.
pub struct MegaClient {
    network: Network,
    api_url: String,
    rpc: Arc<dyn ReadOnlyClient>,
    token: DeployedContract,
    dao: DeployedContract,
    vault: DeployedContract,
    submission: DeployedContract,
    voting: DeployedContract,
}

impl MegaClient {
    /// Client talking HTTP to the configured node.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let rpc = HttpReadOnlyClient::from_config(&config)?;
        Self::with_rpc(config, Arc::new(rpc))
    }

    /// Client on `network` ("mainnet" or "testnet") with default settings.
    pub fn for_network(network: &str) -> Result<Self, ClientError> {
        let network: Network = network.parse()?;
        Self::new(ClientConfig::for_network(network))
    }

    /// Client evaluating queries through a caller-supplied transport.
    pub fn with_rpc(config: ClientConfig, rpc: Arc<dyn ReadOnlyClient>) -> Result<Self, ClientError> {
        let api_url = config.resolved_api_url()?;
        let deployer = config.deployer_principal()?;
        let token_deployer = config.token_deployer_principal()?;
        let bind = |key, deployer| DeployedContract::from_key(key, deployer).map_err(ClientError::Address);

        let client = Self {
            network: config.network,
            api_url,
            rpc,
            token: bind(ContractKey::Token, token_deployer)?,
            dao: bind(ContractKey::Dao, deployer)?,
            vault: bind(ContractKey::Vault, deployer)?,
            submission: bind(ContractKey::Submission, deployer)?,
            voting: bind(ContractKey::Voting, deployer)?,
        };
        info!(network = %client.network, api_url = %client.api_url, "mega client ready");
        Ok(client)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_mainnet(&self) -> bool {
        self.network == Network::Mainnet
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn contract(&self, key: ContractKey) -> &DeployedContract {
        match key {
            ContractKey::Token => &self.token,
            ContractKey::Dao => &self.dao,
            ContractKey::Vault => &self.vault,
            ContractKey::Submission => &self.submission,
            ContractKey::Voting => &self.voting,
        }
    }

    // ── Plumbing ───────────────────────────────────────────────────

    async fn ro(
        &self,
        key: ContractKey,
        function: &str,
        args: Vec<ClarityValue>,
        scope: ErrorScope,
    ) -> Result<ClarityValue, ClientError> {
        self.contract(key)
            .query(self.rpc.as_ref(), function, args)
            .await
            .map_err(|e| translate_error(function, scope, e.into()))
    }

    /// A read-only call whose output is a `response`; the error branch fails.
    async fn ro_ok(
        &self,
        key: ContractKey,
        function: &str,
        args: Vec<ClarityValue>,
    ) -> Result<ClarityValue, ClientError> {
        let value = self.ro(key, function, args, ErrorScope::Standard).await?;
        match value.expect_response().map_err(unexpected(function))? {
            ResponseResult::Ok(v) => Ok(v),
            ResponseResult::Err(v) => Err(ClientError::QueryFailed {
                function: function.to_string(),
                value: v,
            }),
        }
    }

    fn build(
        &self,
        key: ContractKey,
        function: &str,
        args: Vec<ClarityValue>,
    ) -> Result<CallPayload, ClientError> {
        self.contract(key)
            .call(function, args)
            .map_err(|e| translate_error(function, ErrorScope::Standard, e.into()))
    }

    async fn parameter(&self, key: ContractKey, name: &str) -> Result<u128, ClientError> {
        let value = self.ro_ok(key, "get-parameter", vec![ClarityValue::ascii(name)]).await?;
        value.expect_u128().map_err(unexpected("get-parameter"))
    }

    // ── DAO ────────────────────────────────────────────────────────

    /// Whether `extension` is an enabled DAO extension.
    pub async fn is_extension(&self, extension: &str) -> Result<bool, ClientError> {
        let args = vec![principal_arg("is-extension", extension)?];
        let value = self.ro(ContractKey::Dao, "is-extension", args, ErrorScope::Standard).await?;
        value.expect_bool().map_err(unexpected("is-extension"))
    }

    /// Block height at which `proposal` was executed, if it was.
    pub async fn executed_at(&self, proposal: &str) -> Result<Option<u128>, ClientError> {
        let args = vec![principal_arg("executed-at", proposal)?];
        let value = self.ro(ContractKey::Dao, "executed-at", args, ErrorScope::Standard).await?;
        optional_u128("executed-at", value)
    }

    /// Bootstrap the DAO with `proposal`.
    pub fn init(&self, proposal: &str) -> Result<CallPayload, ClientError> {
        let args = vec![principal_arg("init", proposal)?];
        self.build(ContractKey::Dao, "init", args)
    }

    // ── Token ──────────────────────────────────────────────────────

    pub async fn get_token_balance(&self, who: &str) -> Result<u128, ClientError> {
        let args = vec![principal_arg("get-balance", who)?];
        let value = self.ro_ok(ContractKey::Token, "get-balance", args).await?;
        value.expect_u128().map_err(unexpected("get-balance"))
    }

    pub async fn get_decimals(&self) -> Result<u128, ClientError> {
        let value = self.ro_ok(ContractKey::Token, "get-decimals", vec![]).await?;
        value.expect_u128().map_err(unexpected("get-decimals"))
    }

    pub async fn get_name(&self) -> Result<String, ClientError> {
        let value = self.ro_ok(ContractKey::Token, "get-name", vec![]).await?;
        value.expect_string().map_err(unexpected("get-name"))
    }

    pub async fn get_symbol(&self) -> Result<String, ClientError> {
        let value = self.ro_ok(ContractKey::Token, "get-symbol", vec![]).await?;
        value.expect_string().map_err(unexpected("get-symbol"))
    }

    pub async fn get_token_uri(&self) -> Result<Option<String>, ClientError> {
        let value = self.ro_ok(ContractKey::Token, "get-token-uri", vec![]).await?;
        value
            .expect_optional()
            .and_then(|v| v.map(ClarityValue::expect_string).transpose())
            .map_err(unexpected("get-token-uri"))
    }

    pub async fn get_total_supply(&self) -> Result<u128, ClientError> {
        let value = self.ro_ok(ContractKey::Token, "get-total-supply", vec![]).await?;
        value.expect_u128().map_err(unexpected("get-total-supply"))
    }

    /// Transfer `amount` whole tokens. The token's decimals are read fresh
    /// on every call and the amount is scaled exactly; an amount finer than
    /// the token's precision is rejected.
    pub async fn transfer(
        &self,
        amount: Decimal,
        sender: &str,
        recipient: &str,
        memo: Option<&str>,
    ) -> Result<CallPayload, ClientError> {
        let (payload, _, _) = self.transfer_payload(amount, sender, recipient, memo).await?;
        Ok(payload)
    }

    /// [`transfer`](Self::transfer) guarded by a post-condition that
    /// `sender` sends exactly the transferred base units of this client's
    /// token. Decimals are read once for both.
    pub async fn transfer_with_post_condition(
        &self,
        amount: Decimal,
        sender: &str,
        recipient: &str,
        memo: Option<&str>,
    ) -> Result<CallPayload, ClientError> {
        let (payload, base_units, sender) =
            self.transfer_payload(amount, sender, recipient, memo).await?;
        let condition = fungible_post_condition(
            sender,
            base_units,
            self.token_asset(),
            FungibleConditionCode::Equal,
        );
        Ok(payload.with_post_conditions(vec![condition]))
    }

    /// The fungible asset of the bound token contract.
    pub fn token_asset(&self) -> AssetInfo {
        AssetInfo::for_token(self.token.id())
    }

    async fn transfer_payload(
        &self,
        amount: Decimal,
        sender: &str,
        recipient: &str,
        memo: Option<&str>,
    ) -> Result<(CallPayload, u128, Principal), ClientError> {
        let sender: Principal = sender
            .parse()
            .map_err(|e| translate_error("transfer", ErrorScope::Standard, LowerError::from(e)))?;
        let recipient_arg = principal_arg("transfer", recipient)?;

        let decimals = self.get_decimals().await?;
        let decimals = u32::try_from(decimals)
            .map_err(|_| ClientError::Validation(format!("Invalid decimals: {decimals}")))?;
        let base_units =
            to_base_units(amount, decimals).map_err(|e| ClientError::Validation(e.to_string()))?;
        debug!(%amount, decimals, base_units, "scaled transfer amount");

        let memo_arg = ClarityValue::optional(memo.map(|m| ClarityValue::buffer(m.as_bytes())));
        let payload = self.build(
            ContractKey::Token,
            "transfer",
            vec![
                ClarityValue::uint(base_units),
                ClarityValue::Principal(sender.clone()),
                recipient_arg,
                memo_arg,
            ],
        )?;
        Ok((payload.with_memo(memo.map(str::to_string)), base_units, sender))
    }

    // ── Vault ──────────────────────────────────────────────────────

    /// STX held by the vault, in micro-STX.
    pub async fn get_vault_balance(&self) -> Result<u128, ClientError> {
        let value = self.ro(ContractKey::Vault, "get-balance", vec![], ErrorScope::Standard).await?;
        value.expect_u128().map_err(unexpected("get-balance"))
    }

    /// Vault balance of a fungible token, the MEGA token by default.
    pub async fn get_balance_of_token(&self, asset: Option<&str>) -> Result<u128, ClientError> {
        let args = vec![principal_arg("get-balance-of", asset.unwrap_or(DEFAULT_ASSET_CONTRACT))?];
        let value = self.ro_ok(ContractKey::Vault, "get-balance-of", args).await?;
        value.expect_u128().map_err(unexpected("get-balance-of"))
    }

    pub async fn is_asset_whitelisted(&self, asset: &str) -> Result<bool, ClientError> {
        let args = vec![principal_arg("is-whitelisted", asset)?];
        let value = self.ro(ContractKey::Vault, "is-whitelisted", args, ErrorScope::Standard).await?;
        value.expect_bool().map_err(unexpected("is-whitelisted"))
    }

    /// Deposit `amount` micro-STX into the vault.
    pub fn deposit(&self, amount: u128) -> Result<CallPayload, ClientError> {
        self.build(ContractKey::Vault, "deposit", vec![ClarityValue::uint(amount)])
    }

    /// Deposit `amount` base units of a fungible token, the MEGA token by default.
    pub fn deposit_token(&self, amount: u128, asset: Option<&str>) -> Result<CallPayload, ClientError> {
        let asset = principal_arg("deposit-ft", asset.unwrap_or(DEFAULT_ASSET_CONTRACT))?;
        self.build(ContractKey::Vault, "deposit-ft", vec![asset, ClarityValue::uint(amount)])
    }

    pub fn deposit_nft(&self, token_id: u128, asset: &str) -> Result<CallPayload, ClientError> {
        let asset = principal_arg("deposit-nft", asset)?;
        self.build(ContractKey::Vault, "deposit-nft", vec![asset, ClarityValue::uint(token_id)])
    }

    // ── Submission ─────────────────────────────────────────────────

    /// Minimum token balance needed to submit a proposal.
    pub async fn get_token_threshold(&self) -> Result<u128, ClientError> {
        self.parameter(ContractKey::Submission, "proposeThreshold").await
    }

    pub async fn get_proposal_duration(&self) -> Result<u128, ClientError> {
        self.parameter(ContractKey::Submission, "proposalDuration").await
    }

    pub async fn get_minimum_start_delay(&self) -> Result<u128, ClientError> {
        self.parameter(ContractKey::Submission, "minimumProposalStartDelay").await
    }

    pub async fn get_maximum_start_delay(&self) -> Result<u128, ClientError> {
        self.parameter(ContractKey::Submission, "maximumProposalStartDelay").await
    }

    /// Whether `who` holds enough tokens to propose. Reads the balance first
    /// and passes it on to the submission contract.
    pub async fn can_propose(&self, who: &str) -> Result<bool, ClientError> {
        let who_arg = principal_arg("can-propose", who)?;
        let balance = self.get_token_balance(who).await?;
        let value = self
            .ro(
                ContractKey::Submission,
                "can-propose",
                vec![who_arg, ClarityValue::uint(balance)],
                ErrorScope::Standard,
            )
            .await?;
        value.expect_bool().map_err(unexpected("can-propose"))
    }

    pub fn propose(&self, proposal: &str, start_block_height: u128) -> Result<CallPayload, ClientError> {
        let args = vec![principal_arg("propose", proposal)?, ClarityValue::uint(start_block_height)];
        self.build(ContractKey::Submission, "propose", args)
    }

    // ── Voting ─────────────────────────────────────────────────────

    pub fn vote(
        &self,
        is_for: bool,
        proposal: &str,
        delegator: Option<&str>,
    ) -> Result<CallPayload, ClientError> {
        let args = vec![
            ClarityValue::from(is_for),
            principal_arg("vote", proposal)?,
            optional_principal_arg("vote", delegator)?,
        ];
        self.build(ContractKey::Voting, "vote", args)
    }

    /// Cast up to [`MAX_VOTES`] votes in one call.
    pub fn vote_many(&self, votes: &[VoteEntry]) -> Result<CallPayload, ClientError> {
        if votes.len() > MAX_VOTES {
            return Err(ClientError::Validation(
                "Invalid votes: the provided array is too long".to_string(),
            ));
        }
        let entries = votes
            .iter()
            .map(|vote| {
                Ok(ClarityValue::tuple([
                    ("for", ClarityValue::from(vote.is_for)),
                    ("proposal", principal_arg("vote-many", &vote.proposal)?),
                    ("delegator", optional_principal_arg("vote-many", vote.delegator.as_deref())?),
                ]))
            })
            .collect::<Result<Vec<_>, ClientError>>()?;
        self.build(ContractKey::Voting, "vote-many", vec![ClarityValue::list(entries)])
    }

    pub fn delegate(&self, delegatee: &str) -> Result<CallPayload, ClientError> {
        let args = vec![principal_arg("delegate", delegatee)?];
        self.build(ContractKey::Voting, "delegate", args)
    }

    pub fn revoke_delegate(&self, delegatee: &str) -> Result<CallPayload, ClientError> {
        let args = vec![principal_arg("revoke-delegate", delegatee)?];
        self.build(ContractKey::Voting, "revoke-delegate", args)
    }

    pub fn conclude(&self, proposal: &str) -> Result<CallPayload, ClientError> {
        let args = vec![principal_arg("conclude", proposal)?];
        self.build(ContractKey::Voting, "conclude", args)
    }

    pub async fn get_vote_threshold(&self) -> Result<u128, ClientError> {
        self.parameter(ContractKey::Voting, "voteThreshold").await
    }

    pub async fn get_quorum_threshold(&self) -> Result<u128, ClientError> {
        self.parameter(ContractKey::Voting, "quorumThreshold").await
    }

    pub async fn get_execution_delay(&self) -> Result<u128, ClientError> {
        self.parameter(ContractKey::Voting, "executionDelay").await
    }

    /// Recorded state of `proposal`; `None` if the voting contract has never
    /// seen it.
    pub async fn get_proposal(&self, proposal: &str) -> Result<Option<ProposalData>, ClientError> {
        let args = vec![principal_arg("get-proposal-data", proposal)?];
        let value = self
            .ro(ContractKey::Voting, "get-proposal-data", args, ErrorScope::Standard)
            .await?;
        value
            .expect_optional()
            .and_then(|v| v.map(ProposalData::from_value).transpose())
            .map_err(unexpected("get-proposal-data"))
    }

    /// Votes `who` has cast on `proposal` so far.
    pub async fn get_votes_by_address(&self, proposal: &str, who: &str) -> Result<u128, ClientError> {
        let args = vec![
            principal_arg("get-current-total-votes", proposal)?,
            principal_arg("get-current-total-votes", who)?,
        ];
        let value = self
            .ro(ContractKey::Voting, "get-current-total-votes", args, ErrorScope::Standard)
            .await?;
        value.expect_u128().map_err(unexpected("get-current-total-votes"))
    }

    /// Token balance of `who` at `block_height`.
    pub async fn get_voting_power(&self, who: &str, block_height: u128) -> Result<Option<u128>, ClientError> {
        let args = vec![principal_arg("get-voting-power", who)?, ClarityValue::uint(block_height)];
        let value = self
            .ro(ContractKey::Voting, "get-voting-power", args, ErrorScope::Historical)
            .await?;
        optional_u128("get-voting-power", value)
    }

    pub async fn can_vote(
        &self,
        who: &str,
        block_height: u128,
        token_threshold: u128,
    ) -> Result<bool, ClientError> {
        let args = vec![
            principal_arg("can-vote", who)?,
            ClarityValue::uint(block_height),
            ClarityValue::uint(token_threshold),
        ];
        let value = self
            .ro(ContractKey::Voting, "can-vote", args, ErrorScope::Historical)
            .await?;
        value.expect_bool().map_err(unexpected("can-vote"))
    }

    pub async fn can_vote_on_behalf(&self, sender: &str, delegator: Option<&str>) -> Result<bool, ClientError> {
        let args = vec![
            principal_arg("can-vote-on-behalf", sender)?,
            optional_principal_arg("can-vote-on-behalf", delegator)?,
        ];
        let value = self
            .ro(ContractKey::Voting, "can-vote-on-behalf", args, ErrorScope::Standard)
            .await?;
        value.expect_bool().map_err(unexpected("can-vote-on-behalf"))
    }

    pub async fn is_delegating(&self, who: &str) -> Result<bool, ClientError> {
        let args = vec![principal_arg("is-delegating", who)?];
        let value = self
            .ro(ContractKey::Voting, "is-delegating", args, ErrorScope::Standard)
            .await?;
        value.expect_bool().map_err(unexpected("is-delegating"))
    }
}

fn principal_arg(function: &str, address: &str) -> Result<ClarityValue, ClientError> {
    address
        .parse::<Principal>()
        .map(ClarityValue::Principal)
        .map_err(|e| translate_error(function, ErrorScope::Standard, LowerError::from(e)))
}

fn optional_principal_arg(function: &str, address: Option<&str>) -> Result<ClarityValue, ClientError> {
    let inner = address.map(|a| principal_arg(function, a)).transpose()?;
    Ok(ClarityValue::optional(inner))
}

fn optional_u128(function: &str, value: ClarityValue) -> Result<Option<u128>, ClientError> {
    value
        .expect_optional()
        .and_then(|v| v.map(ClarityValue::expect_u128).transpose())
        .map_err(unexpected(function))
}

fn unexpected(function: &str) -> impl FnOnce(ValueError) -> ClientError + '_ {
    move |source| ClientError::UnexpectedValue {
        function: function.to_string(),
        source,
    }
}
