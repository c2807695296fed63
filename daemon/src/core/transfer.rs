use std::sync::Arc;

use log::{debug, warn};

use usdtg_common::{
    asset::Denomination,
    crypto::{Address, Hash},
    ledger::{Amount, SourceTag},
};

use super::{error::CoreError, ledger::LedgerStore, storage::Storage};

// Outcome of one leg of a permissive batch transfer
#[derive(Debug)]
pub enum BatchLegResult {
    Applied(Hash),
    Failed(CoreError),
    // Legs after the first failure are not attempted
    Skipped,
}

// L1: validation and orchestration around the ledger for externally
// initiated transfers, airdrops and permissive batch transfers.
//
// Native transfers are zero-fee by policy. A receiving address that is
// not a smart-contract wallet becomes a bare ledger account simply by
// being credited; the ledger models absent accounts as zero balances.
pub struct TransferEngine<S: Storage> {
    ledger: Arc<LedgerStore<S>>,
}

impl<S: Storage> TransferEngine<S> {
    pub fn new(ledger: Arc<LedgerStore<S>>) -> Self {
        Self { ledger }
    }

    pub fn get_ledger(&self) -> &Arc<LedgerStore<S>> {
        &self.ledger
    }

    pub async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        asset: Denomination,
        amount: Amount,
        memo: Option<String>,
    ) -> Result<Hash, CoreError> {
        debug!("transfer {} {} from {} to {}", amount, asset, from, to);
        self.ledger
            .apply_transfer(from, to, asset, amount, 0, memo)
            .await
    }

    pub async fn airdrop(
        &self,
        to: &Address,
        asset: Denomination,
        amount: Amount,
        reason: &str,
    ) -> Result<Hash, CoreError> {
        debug!("airdrop {} {} to {}", amount, asset, to);
        self.ledger
            .credit(
                to,
                asset,
                amount,
                Some(format!("AIRDROP: {}", reason)),
                SourceTag::Airdrop,
            )
            .await
    }

    // Permissive batch: each leg is an independent ledger operation.
    // After the first failing leg the remaining legs are skipped; already
    // applied legs stay applied. The caller reads the per-leg vector.
    pub async fn batch_transfer(
        &self,
        from: &Address,
        recipients: &[Address],
        asset: Denomination,
        amounts: &[Amount],
        memo: Option<String>,
    ) -> Result<Vec<BatchLegResult>, CoreError> {
        if recipients.len() != amounts.len() {
            return Err(CoreError::BatchShapeMismatch {
                recipients: recipients.len(),
                amounts: amounts.len(),
            });
        }

        // Preflight: the sender must cover the whole batch up front
        let mut total: Amount = 0;
        for amount in amounts {
            total = total
                .checked_add(*amount)
                .ok_or(CoreError::OverflowOnCredit {
                    address: from.clone(),
                })?;
        }

        let balance = self.ledger.get_balance(from, asset).await?;
        if balance < total {
            return Err(CoreError::InsufficientBalance {
                need: total,
                have: balance,
            });
        }

        let mut results = Vec::with_capacity(recipients.len());
        let mut failed = false;
        for (to, amount) in recipients.iter().zip(amounts.iter()) {
            if failed {
                results.push(BatchLegResult::Skipped);
                continue;
            }

            match self
                .ledger
                .apply_transfer(from, to, asset, *amount, 0, memo.clone())
                .await
            {
                Ok(tx_hash) => results.push(BatchLegResult::Applied(tx_hash)),
                Err(error) => {
                    warn!(
                        "batch leg to {} failed, skipping the remaining legs: {}",
                        to, error
                    );
                    failed = true;
                    results.push(BatchLegResult::Failed(error));
                }
            }
        }

        Ok(results)
    }
}
