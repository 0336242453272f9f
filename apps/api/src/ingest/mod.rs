// Document ingestion: format detection, upload validation, text extraction.
// Nothing in here performs network or database I/O.

pub mod extract;
pub mod format;
pub mod validation;

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic documents for extraction and pipeline tests.

    use std::io::Write;

    /// Builds a PDF with one Helvetica text line per page. Offsets in the xref
    /// table are computed from the emitted bytes so pdf-extract can parse it.
    pub fn synthetic_pdf(pages: &[&str]) -> Vec<u8> {
        let page_count = pages.len();
        let font_id = 3;
        let first_page_id = 4;

        let mut objects: Vec<Vec<u8>> = Vec::new();
        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        let kids = (0..page_count)
            .map(|i| format!("{} 0 R", first_page_id + 2 * i))
            .collect::<Vec<_>>()
            .join(" ");
        objects.push(format!("<< /Type /Pages /Kids [{kids}] /Count {page_count} >>").into_bytes());
        objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());
        for (i, text) in pages.iter().enumerate() {
            let content_id = first_page_id + 2 * i + 1;
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {content_id} 0 R /Resources << /Font << /F1 {font_id} 0 R >> >> >>"
                )
                .into_bytes(),
            );
            let stream = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            objects.push(
                format!(
                    "<< /Length {} >>\nstream\n{stream}\nendstream",
                    stream.len()
                )
                .into_bytes(),
            );
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj ", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b" endobj\n");
        }
        let xref_start = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!("trailer << /Size {} /Root 1 0 R >>\nstartxref\n", objects.len() + 1)
                .as_bytes(),
        );
        out.extend_from_slice(format!("{xref_start}\n%%EOF\n").as_bytes());
        out
    }

    /// A .docx whose body holds one single-run paragraph per entry.
    pub fn synthetic_docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!(r#"<w:p><w:r><w:t xml:space="preserve">{p}</w:t></w:r></w:p>"#))
            .collect();
        docx_from_body_xml(&body)
    }

    /// A .docx whose `w:body` contains `body_xml` verbatim.
    pub fn docx_from_body_xml(body_xml: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}</w:body></w:document>"#
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }
}
