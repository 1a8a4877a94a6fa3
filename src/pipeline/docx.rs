//! DOCX → HTML fragment.
//!
//! Only the structure a recipe needs is kept: headings (from the `Heading1`–
//! `Heading6` and `Title` paragraph styles), paragraphs and tables. Run
//! formatting and embedded media are dropped.

use super::markup::escape_html;
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild, TableCellContent};

/// Fragment used when a document has no text at all.
pub const EMPTY_DOCX_HTML: &str = "<p>(empty)</p>";

/// Convert DOCX bytes to an HTML fragment, one block per line.
pub fn docx_to_html(bytes: &[u8]) -> Result<String, docx_rs::ReaderError> {
    let doc = docx_rs::read_docx(bytes)?;
    let mut blocks = Vec::new();

    for child in &doc.document.children {
        match child {
            DocumentChild::Paragraph(para) => {
                let text = paragraph_text(para);
                if text.trim().is_empty() {
                    continue;
                }
                let tag = heading_tag(para).unwrap_or("p");
                blocks.push(format!("<{tag}>{}</{tag}>", escape_html(&text)));
            }
            DocumentChild::Table(table) => {
                let mut html = String::from("<table>");
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(tr) = row;
                    html.push_str("<tr>");
                    for cell in &tr.cells {
                        let docx_rs::TableRowChild::TableCell(tc) = cell;
                        let text: Vec<String> = tc
                            .children
                            .iter()
                            .filter_map(|c| match c {
                                TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                                _ => None,
                            })
                            .collect();
                        html.push_str(&format!("<td>{}</td>", escape_html(&text.join(" "))));
                    }
                    html.push_str("</tr>");
                }
                html.push_str("</table>");
                blocks.push(html);
            }
            _ => {}
        }
    }

    if blocks.is_empty() {
        Ok(EMPTY_DOCX_HTML.to_string())
    } else {
        Ok(blocks.join("\n"))
    }
}

fn heading_tag(para: &Paragraph) -> Option<&'static str> {
    let style = para.property.style.as_ref()?;
    match style.val.as_str() {
        "Title" | "Heading1" => Some("h1"),
        "Heading2" => Some("h2"),
        "Heading3" => Some("h3"),
        "Heading4" => Some("h4"),
        "Heading5" => Some("h5"),
        "Heading6" => Some("h6"),
        _ => None,
    }
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut out = String::new();
    for child in &para.children {
        match child {
            ParagraphChild::Run(run) => push_run(&run.children, &mut out),
            ParagraphChild::Hyperlink(link) => {
                for c in &link.children {
                    if let ParagraphChild::Run(run) = c {
                        push_run(&run.children, &mut out);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn push_run(children: &[RunChild], out: &mut String) {
    for c in children {
        match c {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push(' '),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Run};
    use std::io::Cursor;

    fn build(doc: Docx) -> Vec<u8> {
        let mut buf = Vec::new();
        doc.build().pack(Cursor::new(&mut buf)).unwrap();
        buf
    }

    #[test]
    fn headings_and_paragraphs() {
        let bytes = build(
            Docx::new()
                .add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text("Lemon Tart"))
                        .style("Heading1"),
                )
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Zest <two> lemons."))),
        );
        let html = docx_to_html(&bytes).unwrap();
        assert!(html.contains("<h1>Lemon Tart</h1>"), "{html}");
        assert!(html.contains("<p>Zest &lt;two&gt; lemons.</p>"), "{html}");
    }

    #[test]
    fn empty_document_has_placeholder() {
        let bytes = build(Docx::new());
        assert_eq!(docx_to_html(&bytes).unwrap(), EMPTY_DOCX_HTML);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(docx_to_html(b"definitely not a zip").is_err());
    }
}
