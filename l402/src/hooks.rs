//! Lifecycle hooks around the payment step.
//!
//! Hooks run only when a request came back `402` and an offer was chosen:
//!
//! - **Before**: inspect the planned payment; may abort it
//! - **After**: observe a successful payment
//! - **On failure**: observe a failed payment
//!
//! All methods have no-op defaults. Hooks run in registration order and the
//! first abort wins.

use std::fmt::{self, Debug};

use crate::executor::BoxFuture;
use crate::invoice::Invoice;
use crate::offer::PaymentPlan;

/// Decision returned by [`PaymentHooks::before_payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    /// Go ahead and pay.
    Continue,
    /// Do not pay; the fetch fails with this reason.
    Abort {
        /// Why the payment was refused.
        reason: String,
    },
}

/// What the client is about to pay for.
#[derive(Debug, Clone)]
pub struct PaymentContext {
    /// URL of the metered request that triggered the payment.
    pub url: String,
    /// The offer chosen and its invoice source.
    pub plan: PaymentPlan,
    /// The resolved invoice.
    pub invoice: Invoice,
}

/// Proof that a metered request was paid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Executor-assigned payment identifier.
    pub payment_id: String,
    /// The invoice that was paid.
    pub invoice: Invoice,
    /// Identifier of the offer that was paid, if the server gave one.
    pub offer_id: Option<String>,
}

/// Lifecycle hooks for the payment step.
pub trait PaymentHooks: Send + Sync {
    /// Called after the invoice is known and before it is paid.
    fn before_payment<'a>(&'a self, _ctx: &'a PaymentContext) -> BoxFuture<'a, HookDecision> {
        Box::pin(async { HookDecision::Continue })
    }

    /// Called after the executor reported success.
    fn after_payment<'a>(
        &'a self,
        _ctx: &'a PaymentContext,
        _receipt: &'a PaymentReceipt,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    /// Called when the payment failed or timed out.
    fn on_payment_failure<'a>(
        &'a self,
        _ctx: &'a PaymentContext,
        _reason: &'a str,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}

/// An ordered list of [`PaymentHooks`].
#[derive(Default)]
pub struct HookChain(Vec<Box<dyn PaymentHooks>>);

impl Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HookChain")
            .field(&format!("[{} hooks]", self.0.len()))
            .finish()
    }
}

impl HookChain {
    /// Appends a hook.
    pub fn push(&mut self, hook: impl PaymentHooks + 'static) {
        self.0.push(Box::new(hook));
    }

    /// Runs the before hooks; the first abort wins.
    pub async fn before_payment(&self, ctx: &PaymentContext) -> HookDecision {
        for hook in &self.0 {
            if let HookDecision::Abort { reason } = hook.before_payment(ctx).await {
                return HookDecision::Abort { reason };
            }
        }
        HookDecision::Continue
    }

    /// Runs every after hook.
    pub async fn after_payment(&self, ctx: &PaymentContext, receipt: &PaymentReceipt) {
        for hook in &self.0 {
            hook.after_payment(ctx, receipt).await;
        }
    }

    /// Runs every failure hook.
    pub async fn on_payment_failure(&self, ctx: &PaymentContext, reason: &str) {
        for hook in &self.0 {
            hook.on_payment_failure(ctx, reason).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::offer::InvoiceSource;
    use crate::proto::Offer;

    struct Refuse(&'static str);

    impl PaymentHooks for Refuse {
        fn before_payment<'a>(&'a self, _ctx: &'a PaymentContext) -> BoxFuture<'a, HookDecision> {
            Box::pin(async move {
                HookDecision::Abort {
                    reason: self.0.to_owned(),
                }
            })
        }
    }

    struct Count(Arc<AtomicUsize>);

    impl PaymentHooks for Count {
        fn before_payment<'a>(&'a self, _ctx: &'a PaymentContext) -> BoxFuture<'a, HookDecision> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { HookDecision::Continue })
        }
    }

    fn ctx() -> PaymentContext {
        let invoice = Invoice::parse("lnbc1abc").unwrap();
        PaymentContext {
            url: "https://srv/ticker/AAPL".into(),
            plan: PaymentPlan {
                offer: Offer::default(),
                source: InvoiceSource::Embedded(invoice.clone()),
            },
            invoice,
        }
    }

    #[tokio::test]
    async fn test_first_abort_wins() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut chain = HookChain::default();
        chain.push(Count(Arc::clone(&seen)));
        chain.push(Refuse("over budget"));
        chain.push(Refuse("second"));
        chain.push(Count(Arc::clone(&seen)));

        let decision = chain.before_payment(&ctx()).await;
        assert_eq!(
            decision,
            HookDecision::Abort {
                reason: "over budget".into()
            }
        );
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_continues() {
        let chain = HookChain::default();
        assert_eq!(format!("{chain:?}"), "HookChain(\"[0 hooks]\")");
        assert_eq!(chain.before_payment(&ctx()).await, HookDecision::Continue);
    }
}
