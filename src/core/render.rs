//! Customer-facing text: cart summaries, menu listings and the fixed replies.

use crate::domain::model::{CartLine, Product};
use std::fmt::Write;
use std::sync::Arc;

pub const CLARIFY_ADD: &str = "Em chưa hiểu rõ anh/chị muốn đặt món gì. Anh/chị có thể nói rõ tên món và số lượng không ạ? Ví dụ: 'cho tôi 2 cà phê đen'";
pub const CLARIFY_REMOVE: &str =
    "Em chưa hiểu anh/chị muốn xóa món gì. Anh/chị có thể nói rõ tên món không ạ?";
pub const REMOVED: &str = "Em đã xóa món khỏi giỏ hàng. Anh/chị muốn xem lại giỏ hàng không ạ?";
pub const UPDATE_UNSUPPORTED: &str = "Tính năng cập nhật số lượng đang được phát triển. Anh/chị có thể xóa món và thêm lại với số lượng mới ạ.";
pub const CONFIRM_EMPTY: &str = "Giỏ hàng của anh/chị đang trống. Anh/chị muốn xem menu không ạ?";
pub const ORDER_FAILED: &str = "Xin lỗi, có lỗi xảy ra khi đặt hàng. Anh/chị vui lòng thử lại ạ.";
pub const GENERIC_FAILURE: &str = "Xin lỗi, có lỗi xảy ra. Anh/chị vui lòng thử lại ạ.";
pub const CANCELLED: &str = "Em đã hủy đơn hàng. Anh/chị cần gì nữa không ạ?";
pub const EMPTY_CART: &str = "Giỏ hàng của bạn đang trống.";
const VIEW_CART_PROMPT: &str =
    "\n\nAnh/chị muốn đặt hàng không ạ? Nói 'đặt hàng' hoặc 'xác nhận' để hoàn tất.";

/// Whole-number rendering used for every amount (`25000.0` -> `"25000"`).
pub fn format_price(amount: f64) -> String {
    format!("{:.0}", amount)
}

fn line_entry(out: &mut String, line: &CartLine) {
    let _ = write!(
        out,
        "• {} x{} - {} VNĐ",
        line.product().name,
        line.quantity(),
        format_price(line.subtotal())
    );
}

pub fn greeting(shop_name: &str) -> String {
    format!(
        "Xin chào anh/chị! Em là nhân viên AI của quán {}. Em có thể giúp anh/chị xem menu, đặt món hoặc trả lời câu hỏi. Anh/chị cần gì ạ?",
        shop_name
    )
}

pub fn cart_summary(lines: &[CartLine], total: f64) -> String {
    if lines.is_empty() {
        return EMPTY_CART.to_string();
    }

    let mut out = String::from("=== GIỎ HÀNG CỦA BẠN ===\n\n");
    for line in lines {
        line_entry(&mut out, line);
        if let Some(note) = line.note() {
            let _ = write!(out, " (Ghi chú: {})", note);
        }
        out.push('\n');
    }
    let _ = write!(out, "\nTổng cộng: {} VNĐ", format_price(total));
    out
}

/// Cart summary followed by the prompt to place the order.
pub fn view_cart(lines: &[CartLine], total: f64) -> String {
    let mut out = cart_summary(lines, total);
    out.push_str(VIEW_CART_PROMPT);
    out
}

/// Lists what a single ADD_TO_CART turn put into the cart.
pub fn added(lines: &[CartLine]) -> String {
    let mut out = String::from("Em đã thêm vào giỏ hàng:\n");
    for line in lines {
        line_entry(&mut out, line);
        out.push('\n');
    }
    out.push_str("\nAnh/chị muốn thêm món nữa không ạ? Hoặc nói 'xem giỏ hàng' để kiểm tra.");
    out
}

pub fn clarify_add(suggestions: &[Arc<Product>]) -> String {
    if suggestions.is_empty() {
        return CLARIFY_ADD.to_string();
    }
    let names: Vec<&str> = suggestions.iter().map(|p| p.name.as_str()).collect();
    format!("{}\nCó phải anh/chị muốn: {}?", CLARIFY_ADD, names.join(", "))
}

pub fn order_placed(shop_name: &str, order_id: i64, total: f64) -> String {
    format!(
        "✅ Đặt hàng thành công!\nMã đơn: #{}\nTổng tiền: {} VNĐ\nCảm ơn anh/chị đã đặt hàng tại quán {}!",
        order_id,
        format_price(total),
        shop_name
    )
}

/// Menu grouped by category, categories in first-seen catalog order.
pub fn menu_context(shop_name: &str, products: &[Arc<Product>]) -> String {
    let mut groups: Vec<(&str, Vec<&Product>)> = Vec::new();
    for product in products.iter().map(Arc::as_ref) {
        match groups.iter().position(|(c, _)| *c == product.category) {
            Some(i) => groups[i].1.push(product),
            None => groups.push((product.category.as_str(), vec![product])),
        }
    }

    let mut out = format!("=== MENU QUÁN {} ===\n\n", shop_name.to_uppercase());
    for (category, items) in groups {
        let _ = writeln!(out, "📋 {}:", category);
        for product in items {
            let _ = writeln!(out, "  - {}: {} VNĐ", product.name, format_price(product.price));
        }
        out.push('\n');
    }
    out
}

/// Retrieval hits appended to the menu context for a menu question.
pub fn search_hits(hits: &[Arc<Product>]) -> String {
    let mut out = String::from("Món liên quan đến câu hỏi:\n");
    for product in hits {
        let _ = writeln!(out, "- {}: {} VNĐ", product.name, format_price(product.price));
    }
    out
}

/// Table and cart lines handed to the text generator alongside the menu.
pub fn conversation_context(table_number: Option<&str>, lines: &[CartLine], total: f64) -> String {
    let mut out = String::new();
    if let Some(table) = table_number {
        let _ = writeln!(out, "Bàn: {}", table);
    }
    if lines.is_empty() {
        out.push_str("Giỏ hàng đang trống.\n");
        return out;
    }
    out.push_str("Giỏ hàng hiện tại:\n");
    for line in lines {
        let _ = writeln!(
            out,
            "- {} x{} ({} VNĐ)",
            line.product().name,
            line.quantity(),
            format_price(line.subtotal())
        );
    }
    let _ = writeln!(out, "Tổng: {} VNĐ", format_price(total));
    out
}
