//! End-of-block payment distribution and evidence pruning.
//!
//! Builders pay the module account when their commitment executes; at the
//! end of every block those funds are handed out according to a
//! [`PaymentFn`]. The default sends the whole module balance to the
//! distribution module's account. Per-payment failures are logged and
//! skipped; distribution never aborts a block.
//!
//! Afterwards, commitments and infractions older than the evidence window
//! are pruned.

use crate::keeper::{BankKeeper, Keeper};
use crate::store::KvStore;
use crate::types::{parse_coin_normalized, Coin, Context};

/// Name of the module whose account receives the default distribution.
pub const DISTRIBUTION_MODULE_NAME: &str = "distribution";

/// One payment out of the module account.
#[derive(Clone, Debug, PartialEq)]
pub struct Payment {
    pub to: String,
    pub amount: Vec<Coin>,
}

/// Decides how accumulated auction funds are distributed.
///
/// Called once per block with the payment received for this block's
/// auction (if any) and the module account's total balance. Returns the
/// ordered payments to execute.
pub type PaymentFn =
    Box<dyn Fn(&Context, &[Coin], &[Coin]) -> Result<Vec<Payment>, String> + Send + Sync>;

/// Default policy: the entire module balance goes to `recipient`, meant
/// to be the distribution module's account so funds spread across the
/// validator set. The recipient comes from the keeper's account keeper;
/// this function never derives addresses on its own.
pub fn default_payment_func(recipient: String) -> PaymentFn {
    Box::new(move |_ctx, _auction_payment, total_balance| {
        Ok(vec![Payment {
            to: recipient.clone(),
            amount: total_balance.to_vec(),
        }])
    })
}

/// Runs distribution and pruning for the block in `ctx`.
pub fn end_block<S: KvStore, B: BankKeeper>(
    ctx: &Context,
    keeper: &mut Keeper<S>,
    bank: &mut B,
    payment_fn: Option<&PaymentFn>,
) {
    let height = ctx.block_height;
    let module_account = keeper.module_account_address();

    // Best-effort: the payment this block's auction brought in, if any.
    let auction_payment: Vec<Coin> = keeper
        .segment_commitment_by_height(height)
        .and_then(|sc| parse_coin_normalized(&sc.payment_promise).ok())
        .map(|coin| vec![coin])
        .unwrap_or_default();

    let total_balance = bank.spendable_coins(&module_account);

    tracing::info!(
        height,
        module_account = %module_account,
        auction_payment = ?auction_payment,
        total_balance = ?total_balance,
        "calculating distribution"
    );

    let payments = match payment_fn {
        Some(f) => f(ctx, &auction_payment, &total_balance),
        None => {
            let default = default_payment_func(keeper.module_address(DISTRIBUTION_MODULE_NAME));
            default(ctx, &auction_payment, &total_balance)
        }
    };

    let payments = match payments {
        Ok(payments) => payments,
        Err(err) => {
            tracing::error!(height, err = %err, "payment distribution failed");
            Vec::new()
        }
    };

    for (i, payment) in payments.iter().enumerate() {
        match bank.send_coins(&module_account, &payment.to, &payment.amount) {
            Ok(()) => tracing::debug!(
                height,
                payment = %format!("{}/{}", i + 1, payments.len()),
                to = %payment.to,
                amount = ?payment.amount,
                "distribution payment succeeded"
            ),
            Err(err) => tracing::error!(
                height,
                payment = %format!("{}/{}", i + 1, payments.len()),
                to = %payment.to,
                amount = ?payment.amount,
                err = %err,
                "distribution payment failed"
            ),
        }
    }

    let min_height = height - keeper.params().max_evidence_age_num_blocks;
    keeper.delete_old_segment_commitments(min_height);
    keeper.delete_old_proposer_infractions(min_height);
}
