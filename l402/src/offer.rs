//! Offer selection and invoice source lookup.
//!
//! Turning a 402 body into something payable takes three steps:
//!
//! 1. [`OfferSelector`] picks one offer from the ordered list
//! 2. the first payment method of a supported type is located
//! 3. [`InvoiceSource`] says whether the invoice is embedded or must be
//!    fetched from the server's `payment_request_url`
//!
//! [`plan_payment`] runs all three.

use crate::LIGHTNING;
use crate::error::OfferError;
use crate::invoice::Invoice;
use crate::proto::{InvoiceRequest, Offer, PaymentRequired};

/// Chooses one offer from a 402 response.
///
/// Implement this trait to customize selection, e.g. to prefer an offer
/// by id.
pub trait OfferSelector: Send + Sync {
    /// Returns the offer to pay, or `None` if none is acceptable.
    fn select<'a>(&self, offers: &'a [Offer]) -> Option<&'a Offer>;
}

/// Selector that takes the first offer.
///
/// No prices are compared. Servers are expected to list the cheapest
/// offer first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstOffer;

impl OfferSelector for FirstOffer {
    fn select<'a>(&self, offers: &'a [Offer]) -> Option<&'a Offer> {
        offers.first()
    }
}

/// Selector that takes the first offer priced at or below a ceiling.
///
/// Offers without an amount pass. A declared amount must be within the
/// ceiling, and a declared currency must match `currency`; an amount with
/// no currency is read as being in `currency`.
#[derive(Debug, Clone)]
pub struct MaxAmount {
    currency: String,
    ceiling: u64,
}

impl MaxAmount {
    /// Creates a budget selector for offers quoted in `currency`.
    pub fn new(currency: impl Into<String>, ceiling: u64) -> Self {
        Self {
            currency: currency.into(),
            ceiling,
        }
    }
}

impl OfferSelector for MaxAmount {
    fn select<'a>(&self, offers: &'a [Offer]) -> Option<&'a Offer> {
        offers.iter().find(|offer| {
            let Some(amount) = offer.amount else {
                return true;
            };
            let same_currency = offer
                .currency
                .as_deref()
                .is_none_or(|c| c.eq_ignore_ascii_case(&self.currency));
            same_currency && amount <= self.ceiling
        })
    }
}

/// Where the invoice for a chosen payment method comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceSource {
    /// The invoice is embedded in the 402 body.
    Embedded(Invoice),
    /// The invoice must be requested from the server.
    Resolve {
        /// Endpoint to `POST` to.
        url: String,
        /// Request body.
        request: InvoiceRequest,
    },
}

/// An offer chosen for payment, with its invoice source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPlan {
    /// The chosen offer.
    pub offer: Offer,
    /// How to obtain its invoice.
    pub source: InvoiceSource,
}

/// Selects an offer from a 402 body and locates its invoice.
///
/// `scheme` is the payment type to look for, normally [`LIGHTNING`].
///
/// # Errors
///
/// - [`OfferError::NoOfferAvailable`] if the body lists no offers or the
///   selector declines all of them
/// - [`OfferError::UnsupportedPaymentMethod`] if the chosen offer has no
///   method of type `scheme`
/// - [`OfferError::IncompleteDetails`] / [`OfferError::InvalidInvoice`] if
///   the method's details are unusable
pub fn plan_payment(
    required: &PaymentRequired,
    selector: &dyn OfferSelector,
    scheme: &str,
) -> Result<PaymentPlan, OfferError> {
    let offers = required.offers();
    if offers.is_empty() {
        return Err(OfferError::NoOfferAvailable);
    }
    let offer = selector
        .select(&offers)
        .ok_or(OfferError::NoOfferAvailable)?;
    let source = invoice_source(required, offer, scheme)?;
    Ok(PaymentPlan {
        offer: offer.clone(),
        source,
    })
}

/// Locates the invoice for the first method of type `scheme` in `offer`.
///
/// Inline details win over envelope-level ones; an offer's own `id` stands
/// in for a missing `offer_id`.
///
/// # Errors
///
/// See [`plan_payment`].
pub fn invoice_source(
    required: &PaymentRequired,
    offer: &Offer,
    scheme: &str,
) -> Result<InvoiceSource, OfferError> {
    let method = offer
        .payment_methods
        .iter()
        .find(|m| m.is_type(scheme))
        .ok_or_else(|| OfferError::UnsupportedPaymentMethod {
            offered: offered_types(offer),
        })?;

    let details = method.details().cloned().unwrap_or_default();
    if let Some(encoded) = details.payment_request.as_deref() {
        return Ok(InvoiceSource::Embedded(Invoice::parse(encoded)?));
    }

    let url = details
        .payment_request_url
        .or_else(|| required.payment_request_url.clone())
        .ok_or(OfferError::IncompleteDetails("payment_request_url"))?;
    let offer_id = details
        .offer_id
        .or_else(|| offer.id.clone())
        .ok_or(OfferError::IncompleteDetails("offer_id"))?;
    let payment_context_token = details
        .payment_context_token
        .or_else(|| required.payment_context_token.clone())
        .ok_or(OfferError::IncompleteDetails("payment_context_token"))?;

    Ok(InvoiceSource::Resolve {
        url,
        request: InvoiceRequest {
            offer_id,
            payment_method: LIGHTNING.to_owned(),
            payment_context_token,
        },
    })
}

fn offered_types(offer: &Offer) -> Vec<String> {
    offer
        .payment_methods
        .iter()
        .map(|m| m.payment_type().unwrap_or(LIGHTNING).to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{PaymentDetails, PaymentMethod};

    fn offer(id: &str, methods: Vec<PaymentMethod>) -> Offer {
        Offer {
            id: Some(id.to_owned()),
            payment_methods: methods,
            ..Offer::default()
        }
    }

    fn priced(id: &str, amount: u64, currency: &str) -> Offer {
        Offer {
            amount: Some(amount),
            currency: Some(currency.to_owned()),
            ..offer(id, vec![PaymentMethod::Named("lightning".into())])
        }
    }

    #[test]
    fn test_empty_offers() {
        let required = PaymentRequired::default();
        let err = plan_payment(&required, &FirstOffer, LIGHTNING).unwrap_err();
        assert_eq!(err, OfferError::NoOfferAvailable);
    }

    #[test]
    fn test_first_offer_is_positional() {
        let required = PaymentRequired {
            offers: vec![
                offer("a", vec![PaymentMethod::lightning_invoice("lnbc1aaa")]),
                offer("b", vec![PaymentMethod::lightning_invoice("lnbc1bbb")]),
            ],
            ..PaymentRequired::default()
        };
        let plan = plan_payment(&required, &FirstOffer, LIGHTNING).unwrap();
        assert_eq!(plan.offer.id.as_deref(), Some("a"));
        assert_eq!(
            plan.source,
            InvoiceSource::Embedded(Invoice::parse("lnbc1aaa").unwrap())
        );
    }

    #[test]
    fn test_unsupported_method_only_checks_selected_offer() {
        let required = PaymentRequired {
            offers: vec![
                offer("card-only", vec![PaymentMethod::Named("card".into())]),
                offer("ln", vec![PaymentMethod::lightning_invoice("lnbc1bbb")]),
            ],
            ..PaymentRequired::default()
        };
        let err = plan_payment(&required, &FirstOffer, LIGHTNING).unwrap_err();
        assert_eq!(
            err,
            OfferError::UnsupportedPaymentMethod {
                offered: vec!["card".to_owned()]
            }
        );
    }

    #[test]
    fn test_resolution_from_inline_details() {
        let method = PaymentMethod::Detailed {
            payment_type: None,
            payment_details: PaymentDetails {
                payment_request_url: Some("https://srv/pay".into()),
                offer_id: Some("o-1".into()),
                payment_context_token: Some("ctx-1".into()),
                ..PaymentDetails::default()
            },
        };
        let required = PaymentRequired {
            payment_methods: vec![method],
            ..PaymentRequired::default()
        };
        let plan = plan_payment(&required, &FirstOffer, LIGHTNING).unwrap();
        assert_eq!(
            plan.source,
            InvoiceSource::Resolve {
                url: "https://srv/pay".into(),
                request: InvoiceRequest {
                    offer_id: "o-1".into(),
                    payment_method: "lightning".into(),
                    payment_context_token: "ctx-1".into(),
                },
            }
        );
    }

    #[test]
    fn test_resolution_falls_back_to_envelope() {
        let required = PaymentRequired {
            offers: vec![offer("o-2", vec![PaymentMethod::Named("lightning".into())])],
            payment_request_url: Some("https://srv/pay".into()),
            payment_context_token: Some("ctx-2".into()),
            ..PaymentRequired::default()
        };
        let plan = plan_payment(&required, &FirstOffer, LIGHTNING).unwrap();
        let InvoiceSource::Resolve { url, request } = plan.source else {
            panic!("expected resolution");
        };
        assert_eq!(url, "https://srv/pay");
        assert_eq!(request.offer_id, "o-2");
        assert_eq!(request.payment_context_token, "ctx-2");
    }

    #[test]
    fn test_resolution_missing_context_token() {
        let required = PaymentRequired {
            offers: vec![offer("o-3", vec![PaymentMethod::Named("lightning".into())])],
            payment_request_url: Some("https://srv/pay".into()),
            ..PaymentRequired::default()
        };
        let err = plan_payment(&required, &FirstOffer, LIGHTNING).unwrap_err();
        assert_eq!(err, OfferError::IncompleteDetails("payment_context_token"));
    }

    #[test]
    fn test_max_amount_selector() {
        let offers = vec![
            priced("big", 100, "USD"),
            priced("eur", 1, "EUR"),
            priced("small", 5, "usd"),
        ];
        let selected = MaxAmount::new("USD", 10).select(&offers).unwrap();
        assert_eq!(selected.id.as_deref(), Some("small"));
        assert!(MaxAmount::new("USD", 1).select(&offers).is_none());
    }

    #[test]
    fn test_max_amount_passes_unpriced_offers() {
        let unpriced = offer("free", vec![PaymentMethod::Named("lightning".into())]);
        let offers = vec![priced("big", 100, "USD"), unpriced];
        let selected = MaxAmount::new("USD", 10).select(&offers).unwrap();
        assert_eq!(selected.id.as_deref(), Some("free"));
    }

    #[test]
    fn test_max_amount_without_currency() {
        let bare = |id: &str, amount| Offer {
            amount: Some(amount),
            ..offer(id, vec![PaymentMethod::Named("lightning".into())])
        };
        let offers = vec![bare("over", 50), bare("under", 8)];
        let selected = MaxAmount::new("USD", 10).select(&offers).unwrap();
        assert_eq!(selected.id.as_deref(), Some("under"));
    }

    #[test]
    fn test_selector_declining_all_offers() {
        let required = PaymentRequired {
            offers: vec![priced("big", 100, "USD")],
            ..PaymentRequired::default()
        };
        let err = plan_payment(&required, &MaxAmount::new("USD", 1), LIGHTNING).unwrap_err();
        assert_eq!(err, OfferError::NoOfferAvailable);
    }
}
