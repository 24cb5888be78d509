use std::path::Path;

use console::Style;
use nadir_core::remap::PanoramaOptions;
use nadir_core::stitch::{StitchConfig, StitchReport};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_stitch_summary(
    config: &StitchConfig,
    project: &Path,
    options: &PanoramaOptions,
    layers: usize,
) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Nadir Stitch"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(12)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Project"),
        s.path.apply_to(project.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.path.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Canvas"),
        s.value.apply_to(format!(
            "{}x{}, {:.1}\u{b0}{}",
            options.width,
            options.height,
            options.hfov,
            if options.wraparound() { " wrap" } else { "" }
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Layers"),
        s.value.apply_to(layers)
    );
    println!();

    println!("  {}", s.header.apply_to("Compositing"));
    if let Some(reduce) = config.reduce {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Reduce"),
            s.method.apply_to(reduce)
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Blend"),
            s.method.apply_to(config.blend)
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Order"),
            s.method.apply_to(config.effective_order())
        );
        match config.seam.levels {
            Some(levels) => println!(
                "    {:<12}{}",
                s.label.apply_to("Levels"),
                s.value.apply_to(levels)
            ),
            None => println!(
                "    {:<12}{}",
                s.label.apply_to("Levels"),
                s.disabled.apply_to("auto")
            ),
        }
    }
    if config.output.layers {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Layers"),
            s.value.apply_to("written separately")
        );
    }
    println!();
}

pub fn print_report(report: &StitchReport) {
    let s = Styles::new();

    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Composited"),
        s.value.apply_to(report.composited.len())
    );
    if report.skipped.is_empty() {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Skipped"),
            s.disabled.apply_to("none")
        );
    } else {
        println!(
            "  {:<14}{:?}",
            s.label.apply_to("Skipped"),
            report.skipped
        );
    }
    println!("  {:<14}{:?}", s.label.apply_to("Order"), report.order);
}
