//! Preamble shared by all exam protocols.

use super::document::Document;

/// Environment that shades every other protocol entry.
pub const COLORBOX_ENV: &str = "mycolorbox";

const PACKAGES: &[&str] = &[
    r"\usepackage[svgnames]{xcolor}",
    r"\usepackage{enumitem}",
    r"\usepackage{ragged2e}",
    r"\usepackage[breakable]{tcolorbox}",
    r"\usepackage{graphicx}",
    r"\usepackage[left=1in, right=1in, top=1in, bottom=1in]{geometry}",
    r"\usepackage{eso-pic}",
    r"\usepackage{tikz}",
];

const COLORBOX: &str = concat!(
    r"\newtcolorbox{mycolorbox}{breakable, colback=Gainsboro, coltext=black, ",
    r"opacityfill=0.15, boxsep=0pt, arc=0pt, boxrule=0pt, left=0pt, right=0pt, top=2pt, ",
    r"bottom=2pt, nobeforeafter, fontupper=\normalsize, ",
    r"before upper={\begin{justify}\parindent0pt}, after upper={\end{justify}},}",
);

/// Create a document with the protocol preamble.
///
/// `watermark` is the file name of an image placed, rotated and faded,
/// behind every page. It is resolved relative to the directory the document
/// is compiled in.
pub fn protocol_preamble(watermark: Option<&str>) -> Document {
    let mut doc = Document::new();
    for package in PACKAGES {
        doc.preamble(*package);
    }

    if let Some(image) = watermark {
        doc.preamble(format!(
            concat!(
                r"\newcommand\Watermark{{\put(0, 0.5\paperheight){{\parbox[c][\paperheight]{{",
                r"\paperwidth}}{{\centering \rotatebox[origin=c]{{45}}{{\tikz\node[opacity=0.1]{{",
                r"\includegraphics[width=0.7\textwidth]{{{}}}}};}}}}}}}}",
            ),
            image
        ));
    }

    doc.preamble(COLORBOX);

    if watermark.is_some() {
        doc.preamble(r"\AddToShipoutPictureBG{\Watermark}");
    }

    doc
}
