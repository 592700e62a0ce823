use crate::core::models::LinkItem;

/// Absolute URL of a stored image. Falls back to the page origin when the backend did not
/// send one.
pub fn full_url(item: &LinkItem, origin: &str) -> String {
    match item.full_url.as_deref() {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!("{}{}", origin.trim_end_matches('/'), item.url),
    }
}

pub fn item(item: &LinkItem, origin: &str) -> String {
    let url = html_escape::encode_double_quoted_attribute(&full_url(item, origin)).into_owned();
    format!(
        "<div class=\"link-item flex items-center gap-3 p-3 rounded-lg border border-divider\" data-id=\"{id}\">\
         <img src=\"{url}\" alt=\"\" class=\"w-16 h-16 object-cover rounded flex-shrink-0 bg-gray-800\" loading=\"lazy\" />\
         <div class=\"flex-1 min-w-0\"></div><div class=\"flex items-center gap-2 flex-shrink-0\">\
         <button type=\"button\" class=\"link-copy-btn px-3 py-1.5 rounded text-sm btn-secondary\" data-url=\"{url}\">\
         Скопировать ссылку</button><button type=\"button\" class=\"link-delete-btn px-3 py-1.5 rounded text-sm\" \
         data-id=\"{id}\">Удалить с сервера</button></div></div>",
        id = html_escape::encode_double_quoted_attribute(&item.id),
        url = url,
    )
}

pub fn list(items: &[LinkItem], origin: &str) -> String {
    items.iter().map(|i| item(i, origin)).collect()
}
