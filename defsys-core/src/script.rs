//! R script generation for the circular phylogenetic tree.
//!
//! The script reads the tree, optionally prunes it to a subtree, optionally
//! colours branches by MLST clade, adds one bar ring per defense system and
//! writes a PNG. Every path and name embedded in the program goes through
//! [`r_string`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::layout::LayoutParams;

const LIBRARIES: [&str; 7] = [
    "ggtreeExtra",
    "ggplot2",
    "ggtree",
    "treeio",
    "ggnewscale",
    "ape",
    "dplyr",
];

/// Tree file bundled with ggtreeExtra, used when none is configured.
const BUNDLED_TREE: &str = r#"system.file("extdata", "our_tree.tree", package="ggtreeExtra")"#;

/// One defense-system ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    pub system: String,
    pub color: String,
}

/// Everything the tree script is parameterized by.
#[derive(Clone, Debug)]
pub struct TreeScript {
    pub dataset: PathBuf,
    pub output: PathBuf,
    pub tree_file: Option<PathBuf>,
    /// Tip labels to keep; empty keeps the whole tree.
    pub subtree: Vec<i64>,
    pub mlst: bool,
    pub layers: Vec<Layer>,
    pub layout: LayoutParams,
}

/// Quote a string as an R string literal.
pub fn r_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Quote a column name for use inside `aes()`.
fn r_symbol(value: &str) -> String {
    format!("`{}`", value.replace('\\', "\\\\").replace('`', "\\`"))
}

fn r_path(path: &Path) -> String {
    r_string(&path.to_string_lossy().replace('\\', "/"))
}

impl TreeScript {
    /// Render the complete R program.
    pub fn render(&self) -> String {
        let mut s = String::new();

        for lib in LIBRARIES {
            let _ = writeln!(s, "suppressPackageStartupMessages(library({}))", lib);
        }
        s.push('\n');

        let tree_source = match &self.tree_file {
            Some(path) => r_path(path),
            None => BUNDLED_TREE.to_string(),
        };
        let _ = writeln!(s, "tree <- read.tree({})", tree_source);

        if !self.subtree.is_empty() {
            let tips: Vec<String> = self
                .subtree
                .iter()
                .map(|i| r_string(&i.to_string()))
                .collect();
            let _ = writeln!(s, "subtree <- c({})", tips.join(", "));
            s.push_str("tree <- keep.tip(tree, subtree)\n");
        }

        let _ = writeln!(
            s,
            "dat1 <- read.csv({}, check.names = FALSE)",
            r_path(&self.dataset)
        );
        s.push('\n');

        if self.mlst {
            s.push_str(
                "dat4 <- dat1 %>% select(c(\"index\", \"MLST\"))\n\
                 dat4 <- aggregate(. ~ MLST, dat4, FUN = paste, collapse = \",\")\n\
                 clades <- lapply(dat4$index, function(x) { unlist(strsplit(x, split = \",\")) })\n\
                 names(clades) <- dat4$MLST\n\
                 tree <- groupOTU(tree, clades, \"MLST_color\")\n\
                 p <- ggtree(tree, layout = \"circular\", branch.length = \"none\", \
                 open.angle = 10, size = 0.5, aes(color = MLST_color), show.legend = FALSE)\n",
            );
        } else {
            s.push_str(
                "p <- ggtree(tree, layout = \"circular\", branch.length = \"none\", \
                 open.angle = 10, size = 0.5)\n",
            );
        }

        for (i, layer) in self.layers.iter().enumerate() {
            let offset = if i == 0 {
                self.layout.first_layer_offset
            } else {
                self.layout.layer_offset
            };
            self.write_layer(&mut s, layer, offset);
        }

        let res = self.layout.resolution;
        s.push('\n');
        s.push_str("dat1$index <- as.character(dat1$index)\n");
        s.push_str("p <- p %<+% dat1 + geom_tiplab(show.legend = FALSE, aes(label = strain))\n");
        let _ = writeln!(
            s,
            "png({}, units = \"cm\", width = {}, height = {}, res = 100)",
            r_path(&self.output),
            res,
            res
        );
        s.push_str("plot(p)\n");
        s.push_str("invisible(dev.off())\n");
        s
    }

    fn write_layer(&self, s: &mut String, layer: &Layer, offset: f64) {
        let column = r_symbol(&crate::dataset::column_name(&layer.system));
        let color = r_string(&layer.color);
        let label = r_string(&layer.system);
        let font = self.layout.font_size;
        let spacing = self.layout.spacing;

        let _ = write!(
            s,
            "p <- p + new_scale_colour() +\n  \
             geom_fruit(\n    \
             data = dat1,\n    \
             geom = geom_bar,\n    \
             mapping = aes(y = index, x = {column}, colour = c({color})),\n    \
             orientation = \"y\",\n    \
             width = 1,\n    \
             pwidth = 0.05,\n    \
             offset = {offset},\n    \
             stat = \"identity\",\n    \
             fill = {color}\n  \
             ) +\n  \
             theme(\n    \
             legend.text = element_text(size = {font}),\n    \
             legend.title = element_blank(),\n    \
             legend.margin = margin(c(0, 200, 0, 0)),\n    \
             legend.spacing = unit({spacing}, \"cm\"),\n    \
             legend.spacing.x = unit({spacing}, \"cm\")\n  \
             ) +\n  \
             scale_colour_manual(values = c({color}), labels = c({label}))\n"
        );
    }
}
