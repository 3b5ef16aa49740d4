use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// A cart submitted for ordering. Consumed once by a placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub shipping: String,
    #[serde(default)]
    pub payment_id: Option<i32>,
    #[serde(default, alias = "menus")]
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(default)]
    pub menu_id: Option<i32>,
    #[serde(default, alias = "qty")]
    pub quantity: i32,
    #[serde(default, alias = "product_size_id")]
    pub size_id: Option<i32>,
    #[serde(default, alias = "product_type_id")]
    pub type_id: Option<i32>,
}

/// A cart that passed validation, with every id resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCart {
    pub shipping: String,
    pub payment_id: i32,
    pub lines: Vec<ValidLine>,
}

/// A cart line whose ids are all present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidLine {
    pub menu_id: i32,
    pub quantity: i32,
    pub size_id: i32,
    pub type_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CartField {
    Shipping,
    PaymentId,
    Lines,
    MenuId,
    Quantity,
    SizeId,
    TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Required,
    Positive,
}

/// One failed constraint. `line` is the zero-based cart line index for
/// line-level fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartViolation {
    pub field: CartField,
    pub line: Option<usize>,
    pub rule: Rule,
}

impl CartViolation {
    fn header(field: CartField, rule: Rule) -> Self {
        Self { field, line: None, rule }
    }

    fn line(index: usize, field: CartField, rule: Rule) -> Self {
        Self {
            field,
            line: Some(index),
            rule,
        }
    }

    pub fn message(&self) -> &'static str {
        match (self.field, self.rule) {
            (CartField::Shipping, _) => "Shipping method is required",
            (CartField::PaymentId, Rule::Required) => "Payment method is required",
            (CartField::PaymentId, Rule::Positive) => "Payment method is invalid",
            (CartField::Lines, _) => "Order must contain at least one menu",
            (CartField::MenuId, Rule::Required) => "Menu is required",
            (CartField::MenuId, Rule::Positive) => "Menu is invalid",
            (CartField::Quantity, _) => "Quantity must be at least 1",
            (CartField::SizeId, Rule::Required) => "Product size is required",
            (CartField::SizeId, Rule::Positive) => "Product size is invalid",
            (CartField::TypeId, Rule::Required) => "Product type is required",
            (CartField::TypeId, Rule::Positive) => "Product type is invalid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cart failed validation on {} field(s)", .0.len())]
pub struct CartValidationError(pub Vec<CartViolation>);

impl CartValidationError {
    pub fn violations(&self) -> &[CartViolation] {
        &self.0
    }

    /// Message for the first violation, suitable for a response body.
    pub fn first_message(&self) -> &'static str {
        self.0
            .first()
            .map(CartViolation::message)
            .unwrap_or("Invalid Body")
    }
}

fn check_id(
    value: Option<i32>,
    field: CartField,
    line: Option<usize>,
    out: &mut Vec<CartViolation>,
) -> Option<i32> {
    let violation = |rule| match line {
        Some(i) => CartViolation::line(i, field, rule),
        None => CartViolation::header(field, rule),
    };
    match value {
        None => {
            out.push(violation(Rule::Required));
            None
        }
        Some(v) if v < 1 => {
            out.push(violation(Rule::Positive));
            None
        }
        Some(v) => Some(v),
    }
}

impl Cart {
    /// Checks every constraint and returns the cart with its ids resolved.
    /// All violations are reported, not just the first.
    pub fn validate(&self) -> Result<ValidCart, CartValidationError> {
        let mut violations = Vec::new();

        if self.shipping.trim().is_empty() {
            violations.push(CartViolation::header(CartField::Shipping, Rule::Required));
        }
        let payment_id = check_id(self.payment_id, CartField::PaymentId, None, &mut violations);
        if self.lines.is_empty() {
            violations.push(CartViolation::header(CartField::Lines, Rule::Required));
        }

        let mut valid = Vec::with_capacity(self.lines.len());
        for (i, line) in self.lines.iter().enumerate() {
            let menu_id = check_id(line.menu_id, CartField::MenuId, Some(i), &mut violations);
            if line.quantity < 1 {
                violations.push(CartViolation::line(i, CartField::Quantity, Rule::Positive));
            }
            let size_id = check_id(line.size_id, CartField::SizeId, Some(i), &mut violations);
            let type_id = check_id(line.type_id, CartField::TypeId, Some(i), &mut violations);

            if let (Some(menu_id), Some(size_id), Some(type_id)) = (menu_id, size_id, type_id) {
                valid.push(ValidLine {
                    menu_id,
                    quantity: line.quantity,
                    size_id,
                    type_id,
                });
            }
        }

        match payment_id {
            Some(payment_id) if violations.is_empty() => Ok(ValidCart {
                shipping: self.shipping.trim().to_string(),
                payment_id,
                lines: valid,
            }),
            _ => Err(CartValidationError(violations)),
        }
    }
}
