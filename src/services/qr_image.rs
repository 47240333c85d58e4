use qrcode::{EcLevel, QrCode, render::svg};

/// Renders `payload` as an SVG at least `size` pixels wide.
pub fn render_svg(payload: &str, size: u32, foreground: &str, background: &str) -> anyhow::Result<String> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(size, size)
        .dark_color(svg::Color(foreground))
        .light_color(svg::Color(background))
        .quiet_zone(true)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_with_requested_colors() {
        let svg = render_svg("https://example.com", 256, "#112233", "#fafafa").unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#112233"));
        assert!(svg.contains("#fafafa"));
    }

    #[test]
    fn oversized_payloads_fail() {
        let payload = "x".repeat(8000);
        assert!(render_svg(&payload, 256, "#000000", "#ffffff").is_err());
    }
}
