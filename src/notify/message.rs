use std::fmt::Write;

use crate::{
    dto::orders::OrderWithItems,
    models::{ContactType, OrderStatus, PaymentMethod},
};

/// Human-readable summary of a freshly placed order.
pub fn render_order_message(placed: &OrderWithItems) -> String {
    let order = &placed.order;
    let mut text = String::from("📦 New order!\n\n");

    // Writing into a String cannot fail.
    let _ = writeln!(text, "Customer: {}", order.full_name);
    let _ = writeln!(text, "Phone: {}", order.phone_number);
    let _ = writeln!(text, "Address: {}", order.address);
    let _ = writeln!(text, "Payment method: {}", payment_label(order.payment_method));
    let _ = writeln!(text, "Contact preference: {}", contact_label(order.contact_type));
    if let Some(code) = &order.promo_code {
        let _ = writeln!(text, "Promo code: {code}");
    }
    let _ = writeln!(text, "Amount to pay: {} UAH", order.amount_to_pay.round_dp(2));
    let _ = writeln!(text, "Status: {}", status_label(order.status));

    text.push_str("\nItems:\n");
    for item in &placed.items {
        let _ = writeln!(
            text,
            "- {} {}, vol. {}, {} pcs, {} UAH",
            item.brand,
            item.name,
            item.volume,
            item.quantity,
            item.price.round_dp(2)
        );
    }

    let _ = writeln!(
        text,
        "\nCreated: {}",
        order.created_at.format("%d %B %Y, %H:%M")
    );

    text
}

fn payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Iban => "Bank transfer (IBAN)",
        PaymentMethod::CashOnDelivery => "Cash on delivery",
    }
}

fn contact_label(contact: ContactType) -> &'static str {
    match contact {
        ContactType::Telegram => "Telegram",
        ContactType::Phone => "Phone call",
        ContactType::DontDisturb => "Do not disturb",
    }
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Pending",
        OrderStatus::Cancelled => "Cancelled",
        OrderStatus::Completed => "Completed",
    }
}
