//! Renders an [`ActionResult`] as plain text for any chat channel.

use crate::models::{ActionKind, ActionResult, AmbiguousItem, Cart, CatalogProduct, Payload};
use serde_json::Value;
use std::fmt::Write;

/// Maximum number of products or options listed in one message.
pub const MAX_LISTED: usize = 5;

const PICK_PROMPT: &str =
    "❓ ¿Cuál de estas opciones querés agregar al carrito? (Respondé con el número)";

/// Render a result for the user.
pub fn format_result(result: &ActionResult) -> String {
    match &result.payload {
        Payload::ProductList(products) => format_products(products),
        Payload::Product(product) => format_product(product),
        Payload::Cart(cart) => format_cart(cart),
        Payload::Ambiguity(items) => format_ambiguity(items),
        Payload::Clarification { options } => format_clarification(&result.text, options),
        Payload::Diagnostic(params) => format_unknown(params),
        Payload::Empty if result.action == ActionKind::Unknown => format_unknown(&Value::Null),
        Payload::Empty => result.text.clone(),
    }
}

/// `$25` for whole prices, `$12.50` otherwise, `$?` when unknown.
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) if p.fract() == 0.0 => format!("${p:.0}"),
        Some(p) => format!("${p:.2}"),
        None => "$?".to_string(),
    }
}

fn format_products(products: &[CatalogProduct]) -> String {
    if products.is_empty() {
        return "No encontré productos.".to_string();
    }

    let mut out = String::from("Productos encontrados:");
    for (idx, p) in products.iter().take(MAX_LISTED).enumerate() {
        let color = if p.color.is_empty() {
            "sin color"
        } else {
            p.color.as_str()
        };
        let _ = write!(
            out,
            "\n{}. {} — {} — {}",
            idx + 1,
            p.garment_type,
            format_price(p.base_price()),
            color
        );
    }
    if products.len() > MAX_LISTED {
        let _ = write!(out, "\n…y {} más.", products.len() - MAX_LISTED);
    }
    out
}

fn format_product(product: &CatalogProduct) -> String {
    format!(
        "{} — {}",
        product.display_name(),
        format_price(product.base_price())
    )
}

fn format_cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return format!("Tu carrito (id {}) está vacío.", cart.id);
    }

    let mut out = format!("🛒 Carrito (id {}) con {} items:", cart.id, cart.items.len());
    for (idx, item) in cart.items.iter().enumerate() {
        let (name, price) = match &item.product {
            Some(p) => (p.display_name().to_string(), p.base_price()),
            None => (format!("Producto #{}", item.product_id), None),
        };
        let _ = write!(
            out,
            "\n{}. {} x{} — {}",
            idx + 1,
            name,
            item.qty,
            format_price(price)
        );
    }
    out
}

fn format_ambiguity(items: &[AmbiguousItem]) -> String {
    let mut sections = Vec::with_capacity(items.len());
    for item in items {
        let mut section = format!("Para \"{}\" encontré varias opciones:", item.garment_type);
        for (idx, p) in item.candidates.iter().take(MAX_LISTED).enumerate() {
            let _ = write!(
                section,
                "\n{}. {} {} talla {} — {}",
                idx + 1,
                p.display_name(),
                p.color,
                p.size,
                format_price(p.base_price())
            );
        }
        sections.push(section);
    }
    format!("{}\n\n{PICK_PROMPT}", sections.join("\n\n"))
}

fn format_clarification(text: &str, options: &[String]) -> String {
    let mut out = format!("❓ {text}");
    if !options.is_empty() {
        out.push_str("\nOpciones disponibles:");
        for (idx, option) in options.iter().take(MAX_LISTED).enumerate() {
            let _ = write!(out, "\n{}. {}", idx + 1, option);
        }
    }
    out
}

fn format_unknown(params: &Value) -> String {
    if params.is_null() {
        "No pude entender tu pedido. ¿Podés repetirlo de otra forma?".to_string()
    } else {
        format!("No pude entender tu pedido. ¿Podés repetirlo de otra forma? (Detalle: {params})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fakes::product;
    use crate::models::CartItem;
    use serde_json::json;

    #[test]
    fn test_prices() {
        assert_eq!(format_price(Some(25.0)), "$25");
        assert_eq!(format_price(Some(12.5)), "$12.50");
        assert_eq!(format_price(None), "$?");
    }

    #[test]
    fn test_product_list_is_capped() {
        let products: Vec<_> = (1..=7)
            .map(|i| product(i, "remera", "rojo", "M", 10.0))
            .collect();
        let text = format_result(&ActionResult::new(
            ActionKind::ListProducts,
            "Encontré 7 productos.",
            Payload::ProductList(products),
        ));

        assert!(text.starts_with("Productos encontrados:"));
        assert!(text.contains("\n1. remera — $10 — rojo"));
        assert!(text.contains("\n5. remera"));
        assert!(!text.contains("\n6. "));
        assert!(text.ends_with("…y 2 más."));
    }

    #[test]
    fn test_empty_product_list() {
        let text = format_result(&ActionResult::new(
            ActionKind::ListProducts,
            "Encontré 0 productos.",
            Payload::ProductList(Vec::new()),
        ));
        assert_eq!(text, "No encontré productos.");
    }

    #[test]
    fn test_cart_lines() {
        let cart = Cart {
            id: 12,
            items: vec![
                CartItem {
                    product_id: 1,
                    qty: 2,
                    product: Some(product(1, "pantalón", "azul", "42", 25.0)),
                },
                CartItem {
                    product_id: 9,
                    qty: 1,
                    product: None,
                },
            ],
        };
        let text = format_result(&ActionResult::new(
            ActionKind::CreateCart,
            "Carrito creado",
            Payload::Cart(cart),
        ));
        assert_eq!(
            text,
            "🛒 Carrito (id 12) con 2 items:\n1. pantalón x2 — $25\n2. Producto #9 x1 — $?"
        );
    }

    #[test]
    fn test_empty_cart_single_line() {
        let text = format_result(&ActionResult::new(
            ActionKind::GetCart,
            "Tu carrito (id 3) está vacío.",
            Payload::Cart(Cart {
                id: 3,
                items: Vec::new(),
            }),
        ));
        assert_eq!(text, "Tu carrito (id 3) está vacío.");
    }

    #[test]
    fn test_ambiguity_lists_every_item() {
        let shirts: Vec<_> = (1..=6)
            .map(|i| product(i, "remera", "rojo", "M", 10.0))
            .collect();
        let pants = vec![
            product(10, "pantalón", "azul", "42", 25.0),
            product(11, "pantalón", "negro", "44", 27.5),
        ];
        let text = format_result(&ActionResult::new(
            ActionKind::AskSpecifications,
            "Encontré varias opciones",
            Payload::Ambiguity(vec![
                AmbiguousItem {
                    garment_type: "remera".to_string(),
                    candidates: shirts,
                },
                AmbiguousItem {
                    garment_type: "pantalón".to_string(),
                    candidates: pants,
                },
            ]),
        ));

        assert!(text.contains("Para \"remera\" encontré varias opciones:"));
        assert!(text.contains("\n5. remera rojo talla M — $10"));
        assert!(!text.contains("\n6. remera"));
        assert!(text.contains("Para \"pantalón\" encontré varias opciones:"));
        assert!(text.contains("\n2. pantalón negro talla 44 — $27.50"));
        assert!(text.ends_with(PICK_PROMPT));
    }

    #[test]
    fn test_single_product() {
        let text = format_result(&ActionResult::new(
            ActionKind::GetProduct,
            "Producto: gorra",
            Payload::Product(product(5, "gorra", "negro", "U", 8.0)),
        ));
        assert_eq!(text, "gorra — $8");
    }

    #[test]
    fn test_clarification_with_options() {
        let text = format_result(&ActionResult::new(
            ActionKind::AskSpecifications,
            "¿Qué talla?",
            Payload::Clarification {
                options: vec!["S".to_string(), "M".to_string()],
            },
        ));
        assert_eq!(text, "❓ ¿Qué talla?\nOpciones disponibles:\n1. S\n2. M");
    }

    #[test]
    fn test_unknown_includes_params() {
        let text = format_result(&ActionResult::new(
            ActionKind::Unknown,
            "No pude entender la acción.",
            Payload::Diagnostic(json!({"message": "hola"})),
        ));
        assert!(text.starts_with("No pude entender tu pedido."));
        assert!(text.contains(r#"{"message":"hola"}"#));
    }

    #[test]
    fn test_text_only_results_pass_through() {
        let text = format_result(&ActionResult::text_only(
            ActionKind::GetCart,
            "Necesito el id de tu carrito para mostrarlo.",
        ));
        assert_eq!(text, "Necesito el id de tu carrito para mostrarlo.");
    }
}
