use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::{
    account::AccountType,
    asset::Denomination,
    bonus::{BonusTier, SystemBonusStats, UserBonusStats},
    crypto::{Address, Hash},
    ledger::{Amount, JournalEntry},
    recovery::RecoveryChannel,
};

// Typed request/response payloads used by every external adapter
// (HTTP handlers, CLI, gateway bridges). Adapters never see internal
// handles, only addresses and hashes.

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GetBalanceParams {
    pub address: Address,
    pub asset: Denomination,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GetBalanceResult {
    pub address: Address,
    pub asset: Denomination,
    pub balance: Amount,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TransferParams {
    pub from: Address,
    pub to: Address,
    pub asset: Denomination,
    pub amount: Amount,
    pub memo: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TransferResult {
    pub tx_hash: Hash,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AirdropParams {
    pub to: Address,
    pub asset: Denomination,
    pub amount: Amount,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BatchTransferParams {
    pub from: Address,
    pub asset: Denomination,
    pub recipients: Vec<Address>,
    pub amounts: Vec<Amount>,
    pub memo: Option<String>,
}

// One leg of a permissive batch transfer.
// Legs after the first failure are skipped, never rolled back.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TransferLegOutcome {
    Applied { tx_hash: Hash },
    Failed { error: ApiError },
    Skipped,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BatchTransferResult {
    pub legs: Vec<TransferLegOutcome>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ListJournalParams {
    pub address: Address,
    pub cursor: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct JournalPage {
    pub entries: Vec<JournalEntry>,
    pub next_cursor: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateWalletParams {
    pub owner: Address,
    pub account_type: AccountType,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateWalletResult {
    pub wallet_address: Address,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExecuteMetaTxResult {
    pub execution_hash: Hash,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GenerateRecoveryCodeParams {
    pub wallet: Address,
    pub channel: RecoveryChannel,
    pub identifier: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConfirmPurchaseParams {
    pub wallet: Address,
    pub user_id: String,
    pub purchase_amount: Amount,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BonusView {
    pub bonus_id: Hash,
    pub wallet: Address,
    pub tier: BonusTier,
    pub bonus_amount: Amount,
    pub distributed: bool,
    pub credit_tx_hash: Option<Hash>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserStatsResult {
    pub wallet: Address,
    pub stats: UserBonusStats,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SystemStatsResult {
    pub stats: SystemBonusStats,
}

// Per-step outcome of a multi-step orchestration.
// Partial effects are surfaced here, never hidden behind a single error.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum StepOutcome {
    Completed,
    Failed { error: ApiError },
    Skipped,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StepReport {
    pub step: String,
    pub outcome: StepOutcome,
}

// Report for the purchase-confirmed orchestration:
// create_bonus then distribute_bonus.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PurchaseReport {
    pub bonus_id: Option<Hash>,
    pub credit_tx_hash: Option<Hash>,
    pub steps: Vec<StepReport>,
}
