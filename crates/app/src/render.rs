//! Server-side HTML for the login and dashboard routes.

use domdash_core::table::{PageNav, SortDirection, TableView};

use crate::dashboard::dashboard_href;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #18181b; background: #fafafa; }
main.login { min-height: 100vh; display: flex; align-items: center; justify-content: center; }
.card { max-width: 28rem; width: 100%; padding: 2rem; background: #fff; border-radius: .5rem; box-shadow: 0 1px 3px rgba(0,0,0,.15); }
label { display: block; font-size: .875rem; margin-bottom: .25rem; }
input { width: 100%; box-sizing: border-box; padding: .5rem; margin-bottom: 1rem; border: 1px solid #d4d4d8; border-radius: .375rem; }
button { padding: .5rem 1rem; border: 0; border-radius: .375rem; background: #27272a; color: #fff; cursor: pointer; }
button:disabled { opacity: .6; cursor: progress; }
.error { color: #ef4444; font-size: .875rem; margin-bottom: 1rem; }
header { display: flex; justify-content: space-between; align-items: center; padding: 1rem 1.5rem; border-bottom: 1px solid #e4e4e7; }
.toolbar { display: flex; flex-wrap: wrap; gap: 1rem; justify-content: space-between; align-items: center; padding: 1rem 1.5rem; }
.toolbar input { margin: 0; max-width: 24rem; }
.pager { display: flex; gap: .5rem; align-items: center; white-space: nowrap; }
.pager a, .pager span.control { padding: .25rem .5rem; border-radius: .375rem; text-decoration: none; color: inherit; }
.pager span.control { opacity: .4; }
.table-wrap { overflow: auto; padding: 0 1.5rem 1.5rem; }
table { border-collapse: collapse; width: 100%; }
th { background: #f4f4f5; white-space: nowrap; }
th a { color: inherit; text-decoration: none; font-weight: 700; }
td { text-align: center; white-space: nowrap; padding: .5rem; border-top: 1px solid #e4e4e7; }
.danger { background: #dc2626; }
"#;

const LOGIN_SCRIPT: &str = r#"
document.getElementById('login-form').addEventListener('submit', function () {
  var button = this.querySelector('button');
  button.disabled = true;
  button.textContent = 'Logging in...';
  this.querySelectorAll('input').forEach(function (input) { input.readOnly = true; });
});
"#;

/// Escapes text for use in element content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape_html(title)
    )
}

/// Entry route. `error` is shown inline above the submit button.
pub fn login_page(username: &str, error: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<main class=\"login\"><div class=\"card\">\n");
    body.push_str("<h2>LogIn</h2>\n<p>Please login with your credentials</p>\n");
    body.push_str("<form id=\"login-form\" method=\"post\" action=\"/login\">\n");
    body.push_str("<label for=\"username\">Username</label>\n");
    body.push_str(&format!(
        "<input id=\"username\" name=\"username\" type=\"text\" placeholder=\"demo\" value=\"{}\" required>\n",
        escape_html(username)
    ));
    body.push_str("<label for=\"password\">Password</label>\n");
    body.push_str(
        "<input id=\"password\" name=\"password\" type=\"password\" placeholder=\"••••••••\" required>\n",
    );
    if let Some(message) = error {
        body.push_str(&format!(
            "<div class=\"error\" role=\"alert\">{}</div>\n",
            escape_html(message)
        ));
    }
    body.push_str("<button type=\"submit\">Login &rarr;</button>\n</form>\n");
    body.push_str(&format!("<script>{LOGIN_SCRIPT}</script>\n"));
    body.push_str("</div></main>");

    document("Login", &body)
}

/// Dashboard route: search box, pagination controls and the current page.
pub fn dashboard_page(view: &TableView<'_>, username: &str) -> String {
    let mut body = String::new();
    body.push_str("<header>\n<h1>Domain Data</h1>\n");
    body.push_str(&format!(
        "<form method=\"post\" action=\"/logout\"><span>{}</span> \
         <button class=\"danger\" type=\"submit\">Logout</button></form>\n",
        escape_html(username)
    ));
    body.push_str("</header>\n<div class=\"toolbar\">\n");
    body.push_str(&search_form(view));
    body.push_str(&pager(view));
    body.push_str("</div>\n<div class=\"table-wrap\">\n");
    body.push_str(&table(view));
    body.push_str("</div>");

    document("Domain Data", &body)
}

fn search_form(view: &TableView<'_>) -> String {
    let mut form = String::from("<form method=\"get\" action=\"/dashboard\" role=\"search\">\n");
    form.push_str(&format!(
        "<input type=\"search\" name=\"q\" placeholder=\"Search...\" value=\"{}\">\n",
        escape_html(&view.state.filter_text)
    ));
    if let Some(sort) = view.state.sort {
        form.push_str(&format!(
            "<input type=\"hidden\" name=\"sort\" value=\"{}\">\n\
             <input type=\"hidden\" name=\"dir\" value=\"{}\">\n",
            sort.field.key(),
            sort.direction.as_str()
        ));
    }
    form.push_str("</form>\n");
    form
}

fn pager(view: &TableView<'_>) -> String {
    let pagination = view.pagination;
    let target = |nav: PageNav, enabled: bool| {
        enabled.then(|| dashboard_href(&view.state.navigate(nav, pagination.total_pages)))
    };

    let mut pager = String::from("<nav class=\"pager\" aria-label=\"Pagination\">\n");
    pager.push_str(&pager_control(
        "&laquo;",
        "First page",
        target(PageNav::First, pagination.has_previous()),
    ));
    pager.push_str(&pager_control(
        "&lsaquo;",
        "Previous page",
        target(PageNav::Previous, pagination.has_previous()),
    ));
    pager.push_str(&format!(
        "<span class=\"status\">Page {} of {}</span>\n",
        pagination.current_page, pagination.total_pages
    ));
    pager.push_str(&pager_control(
        "&rsaquo;",
        "Next page",
        target(PageNav::Next, pagination.has_next()),
    ));
    pager.push_str(&pager_control(
        "&raquo;",
        "Last page",
        target(PageNav::Last, pagination.has_next()),
    ));
    pager.push_str("</nav>\n");
    pager
}

fn pager_control(symbol: &str, label: &str, href: Option<String>) -> String {
    match href {
        Some(href) => format!(
            "<a href=\"{}\" aria-label=\"{label}\">{symbol}</a>\n",
            escape_html(&href)
        ),
        None => format!(
            "<span class=\"control\" aria-label=\"{label}\" aria-disabled=\"true\">{symbol}</span>\n"
        ),
    }
}

fn table(view: &TableView<'_>) -> String {
    let mut table = String::from("<table>\n");
    if !view.columns.is_empty() {
        table.push_str("<thead><tr>");
    }
    for column in &view.columns {
        let aria_sort = match view.state.sort {
            Some(sort) if sort.field == column.key => match sort.direction {
                SortDirection::Ascending => "ascending",
                SortDirection::Descending => "descending",
            },
            _ => "none",
        };
        let href = dashboard_href(&view.state.toggle_sort(column.key));
        table.push_str(&format!(
            "<th aria-sort=\"{aria_sort}\"><a href=\"{}\">{} &#8597;</a></th>",
            escape_html(&href),
            escape_html(&column.label)
        ));
    }
    if !view.columns.is_empty() {
        table.push_str("</tr></thead>\n");
    }
    table.push_str("<tbody>\n");
    for record in &view.rows {
        table.push_str("<tr>");
        for value in record.values() {
            table.push_str(&format!("<td>{}</td>", escape_html(&value.to_string())));
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</tbody>\n</table>\n");
    if view.rows.is_empty() {
        table.push_str("<p class=\"empty\">No results.</p>\n");
    }
    table
}
