//! Standalone component pages

use super::ComponentPage;
use std::fmt::Write;

const STYLE: &str = "
            body {
                background: black;
                color: white;
                font-family: arial;
            }

            h1 {
                font-size: xxx-large;
                margin-bottom: 0px;
            }

            a:link {
                background-color: lightgreen;
                font-size: 25px;
            }
";

/// Escape text for HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the page of one component
pub fn component_page(page: &ComponentPage, base_url: &str) -> String {
    let name = escape_html(&page.name);
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    let _ = writeln!(out, "<title>{name}</title>");
    let _ = writeln!(out, "<style>{STYLE}</style>");
    out.push_str("</head>\n<body>\n");
    let _ = writeln!(out, "<h1>{name}</h1>");
    let _ = writeln!(
        out,
        "<img src=\"../final/{}.jpg\" alt=\"Component {}: {name}\">",
        page.index - 1,
        page.index
    );
    if let Some([x, y, z]) = page.cut_coords {
        let _ = writeln!(out, "<p>Cut coordinates: x={x:.1}, y={y:.1}, z={z:.1}</p>");
    }
    let _ = writeln!(
        out,
        "<a href=\"{}\">related brain structures</a>",
        escape_html(&page.related_url(base_url))
    );
    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape_html("<Left & \"Right\">"),
            "&lt;Left &amp; &quot;Right&quot;&gt;"
        );
    }

    #[test]
    fn test_component_page() {
        let page = ComponentPage {
            dimension: 256,
            index: 7,
            name: "Inferior <frontal> gyrus".to_string(),
            cut_coords: Some([-44.0, 20.5, 8.0]),
            labels: Vec::new(),
            related: Vec::new(),
        };
        let html = component_page(&page, "https://parietal-inria.github.io/DiFuMo");

        assert!(html.contains("<h1>Inferior &lt;frontal&gt; gyrus</h1>"));
        assert!(html.contains("background: black;"));
        assert!(html.contains("<img src=\"../final/6.jpg\""));
        assert!(html.contains("x=-44.0, y=20.5, z=8.0"));
        assert!(html.contains(
            "<a href=\"https://parietal-inria.github.io/DiFuMo/256/related/component_7\">related brain structures</a>"
        ));
    }
}
