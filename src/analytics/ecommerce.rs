//! Payloads for the event and e-commerce operations.
//!
//! Universal commands take a single field object; classic commands take positional arguments.
//! Each payload knows how to produce both.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::util::obj::{assign, string_or_null};

fn to_fields<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or_else(|err| {
        log::error!("failed to serialize e-commerce payload: {err}");
        Value::Object(Map::new())
    })
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// A user interaction reported with `send event`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    pub category: String,
    pub action: Option<String>,
    pub label: Option<String>,
    pub value: Option<i64>,
    pub non_interaction: Option<bool>,
    pub custom: Map<String, Value>,
}

impl Event {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_non_interaction(mut self, non_interaction: bool) -> Self {
        self.non_interaction = Some(non_interaction);
        self
    }

    /// Merges the keys of `custom` into the field object. Non-object values are ignored.
    pub fn with_custom(mut self, custom: &Value) -> Self {
        assign(&mut self.custom, custom);
        self
    }

    /// `_trackEvent` arguments: category, action, label, value, non-interaction.
    pub fn classic_args(&self) -> Vec<Value> {
        vec![
            Value::String(self.category.clone()),
            string_or_null(self.action.as_deref()),
            string_or_null(self.label.as_deref()),
            self.value.map(Value::from).unwrap_or(Value::Null),
            Value::Bool(self.non_interaction.unwrap_or(false)),
        ]
    }

    /// `send` arguments after the hit type. `page` is filled in from `page` when the custom
    /// fields do not carry one.
    pub fn universal_args(&self, page: &str) -> Vec<Value> {
        let mut fields = Map::new();
        if let Some(non_interaction) = self.non_interaction {
            fields.insert("nonInteraction".into(), Value::Bool(non_interaction));
        }
        for (key, value) in &self.custom {
            fields.insert(key.clone(), value.clone());
        }
        let has_page = fields
            .get("page")
            .map_or(false, |value| !value.is_null() && value != "");
        if !has_page {
            fields.insert("page".into(), Value::String(page.to_string()));
        }

        vec![
            Value::String(self.category.clone()),
            string_or_null(self.action.as_deref()),
            string_or_null(self.label.as_deref()),
            self.value.map(Value::from).unwrap_or(Value::Null),
            Value::Object(fields),
        ]
    }
}

/// Classic e-commerce transaction header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub affiliation: Option<String>,
    pub revenue: Option<String>,
    pub tax: Option<String>,
    pub shipping: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    /// Falls back to the configured currency.
    pub currency: Option<String>,
}

#[derive(Serialize)]
struct TransactionFields<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    affiliation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revenue: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tax: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipping: Option<&'a str>,
    currency: &'a str,
}

impl Transaction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn classic_args(&self) -> Vec<Value> {
        vec![
            Value::String(self.id.clone()),
            string_or_null(self.affiliation.as_deref()),
            string_or_null(self.revenue.as_deref()),
            string_or_null(self.tax.as_deref()),
            string_or_null(self.shipping.as_deref()),
            string_or_null(self.city.as_deref()),
            string_or_null(self.state.as_deref()),
            string_or_null(self.country.as_deref()),
        ]
    }

    pub fn universal_fields(&self, default_currency: &str) -> Value {
        to_fields(&TransactionFields {
            id: &self.id,
            affiliation: self.affiliation.as_deref(),
            revenue: self.revenue.as_deref(),
            tax: self.tax.as_deref(),
            shipping: self.shipping.as_deref(),
            currency: self.currency.as_deref().unwrap_or(default_currency),
        })
    }
}

/// A line item belonging to a classic transaction.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Item {
    #[serde(rename = "id")]
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
}

impl Item {
    pub fn new(transaction_id: impl Into<String>, sku: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            sku: sku.into(),
            ..Default::default()
        }
    }

    pub fn classic_args(&self) -> Vec<Value> {
        vec![
            Value::String(self.transaction_id.clone()),
            Value::String(self.sku.clone()),
            string_or_null(self.name.as_deref()),
            string_or_null(self.category.as_deref()),
            string_or_null(self.price.as_deref()),
            string_or_null(self.quantity.as_deref()),
        ]
    }

    pub fn universal_fields(&self) -> Value {
        to_fields(self)
    }
}

/// Enhanced e-commerce product details.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Custom dimensions and metrics, merged over the standard fields.
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl Product {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn classic_args(&self) -> Vec<Value> {
        vec![
            Value::String(self.id.clone()),
            string_or_null(self.name.as_deref()),
            string_or_null(self.category.as_deref()),
            string_or_null(self.brand.as_deref()),
            string_or_null(self.variant.as_deref()),
            string_or_null(self.price.as_deref()),
            string_or_null(self.quantity.as_deref()),
            string_or_null(self.coupon.as_deref()),
            string_or_null(self.position.as_deref()),
        ]
    }

    pub fn universal_fields(&self) -> Value {
        to_fields(self)
    }
}

/// A product seen in a list.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Impression {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

impl Impression {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// `_addImpression` puts the list name third.
    pub fn classic_args(&self) -> Vec<Value> {
        vec![
            Value::String(self.id.clone()),
            string_or_null(self.name.as_deref()),
            string_or_null(self.list.as_deref()),
            string_or_null(self.brand.as_deref()),
            string_or_null(self.category.as_deref()),
            string_or_null(self.variant.as_deref()),
            string_or_null(self.position.as_deref()),
            string_or_null(self.price.as_deref()),
        ]
    }

    pub fn universal_fields(&self) -> Value {
        to_fields(self)
    }
}

/// An internal promotion.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Promo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl Promo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn classic_args(&self) -> Vec<Value> {
        vec![
            Value::String(self.id.clone()),
            string_or_null(self.name.as_deref()),
            string_or_null(self.creative.as_deref()),
            string_or_null(self.position.as_deref()),
        ]
    }

    pub fn universal_fields(&self) -> Value {
        to_fields(self)
    }
}

/// Action data attached to `ec:setAction`. Empty values are left out of the wire object.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActionFields {
    #[serde(skip_serializing_if = "is_blank")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub affiliation: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub revenue: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub tax: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub shipping: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub coupon: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub list: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub option: Option<String>,
}

impl ActionFields {
    pub fn for_transaction(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn for_list(list: impl Into<String>) -> Self {
        Self {
            list: Some(list.into()),
            ..Default::default()
        }
    }

    pub fn to_value(&self) -> Value {
        to_fields(self)
    }
}

/// Direction of a cart change reported by `track_cart`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CartAction {
    Add,
    Remove,
}

impl CartAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CartAction::Add => "add",
            CartAction::Remove => "remove",
        }
    }

    /// Label of the `UX click` event accompanying the action.
    pub fn event_label(self) -> &'static str {
        match self {
            CartAction::Add => "add to cart",
            CartAction::Remove => "remove from cart",
        }
    }
}
