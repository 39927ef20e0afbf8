// THEORY:
// The wizard is a thin front-end over `RecolorSession`. Every choice the operator has
// to make can be passed as a flag; whatever is missing is asked for on stdin. The
// library never prompts, so the same session drives scripted and interactive runs.

/// Textures with at least this many pixels are committed on the worker pool.
const PARALLEL_PIXEL_THRESHOLD: usize = 1 << 20;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use texture_recolor::core_modules::color_clusterer::{DEFAULT_CLUSTER_COUNT, DEFAULT_SAMPLE_STRIDE};
use texture_recolor::core_modules::material::ImageSource;
use texture_recolor::core_modules::utils::image_helper::image_helper;
use texture_recolor::parallel_pipeline::ParallelRecolorer;
use texture_recolor::{
    AnalysisConfig, AssetDocument, Pixel, PipelineConfig, RecolorSession, SelectionCriteria,
    TextureBuffer, TransformationMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    Above,
    Below,
    Between,
    Color,
    Cluster,
    Clusters,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Method as ValueEnum>::from_str(s, true)
    }
}

#[derive(Parser)]
#[command(name = "recolor-wizard")]
#[command(about = "Analyze a texture's dominant colors and recolor a selected region")]
struct Args {
    /// Texture image to recolor
    #[arg(long, conflicts_with = "gltf", required_unless_present = "gltf")]
    texture: Option<PathBuf>,

    /// glTF document whose image should be recolored
    #[arg(long, requires = "image")]
    gltf: Option<PathBuf>,

    /// Index into the glTF `images` array
    #[arg(long)]
    image: Option<usize>,

    /// Number of color groups to extract
    #[arg(long, env = "RECOLOR_CLUSTERS", default_value_t = DEFAULT_CLUSTER_COUNT)]
    clusters: usize,

    /// Cluster every n-th pixel
    #[arg(long, env = "RECOLOR_SAMPLE_STRIDE", default_value_t = DEFAULT_SAMPLE_STRIDE)]
    sample_stride: usize,

    /// Seed for reproducible clustering
    #[arg(long, env = "RECOLOR_SEED")]
    seed: Option<u64>,

    /// How pixels are selected
    #[arg(long, value_enum)]
    method: Option<Method>,

    /// Brightness threshold for `above` / `below`
    #[arg(long)]
    threshold: Option<i64>,

    /// Lower brightness bound for `between`
    #[arg(long)]
    min: Option<i64>,

    /// Upper brightness bound for `between`
    #[arg(long)]
    max: Option<i64>,

    /// Color to match for `color`, as #RRGGBB
    #[arg(long)]
    match_color: Option<Pixel>,

    /// Group ids for `cluster` / `clusters`, comma separated
    #[arg(long, value_delimiter = ',')]
    groups: Vec<usize>,

    /// Match tolerance in percent
    #[arg(long)]
    tolerance: Option<f64>,

    /// Replacement color, as #RRGGBB
    #[arg(long)]
    target: Option<Pixel>,

    /// smart or tint
    #[arg(long)]
    mode: Option<TransformationMode>,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Worker threads for the commit; large textures use one per core when unset
    #[arg(long, env = "RECOLOR_WORKERS")]
    workers: Option<usize>,

    /// Where to write the recolored PNG. Embedded glTF images are re-embedded when unset
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to write the updated glTF document
    #[arg(long)]
    output_gltf: Option<PathBuf>,

    /// Print groups and the commit report as JSON
    #[arg(long)]
    json: bool,
}

/// Line-oriented questions on stdin.
struct Prompter<R> {
    input: R,
}

impl<R: BufRead> Prompter<R> {
    fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(default) => print!("{question} [{default}]: "),
            None => print!("{question}: "),
        }
        std::io::stdout().flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed while waiting for: {question}");
        }
        let answer = line.trim();
        Ok(match (answer.is_empty(), default) {
            (true, Some(default)) => default.to_string(),
            _ => answer.to_string(),
        })
    }

    fn ask_parsed<T>(&mut self, question: &str, default: Option<&str>) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        loop {
            let answer = self.ask(question, default)?;
            match answer.parse() {
                Ok(value) => return Ok(value),
                Err(e) => println!("  {e}"),
            }
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(question, Some("n"))?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

fn parse_groups(input: &str) -> Result<Vec<usize>> {
    input
        .split(',')
        .map(|id| id.trim().parse::<usize>().with_context(|| format!("invalid group id {id:?}")))
        .collect()
}

fn default_output(input: &Path, extension: &str) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("texture");
    input.with_file_name(format!("{stem}_recolored.{extension}"))
}

fn parallel_recolorer(workers: Option<usize>, pixel_count: usize) -> Option<ParallelRecolorer> {
    match workers {
        Some(n) => Some(ParallelRecolorer::new(n)),
        None if pixel_count >= PARALLEL_PIXEL_THRESHOLD => Some(ParallelRecolorer::default()),
        None => None,
    }
}

/// Points image `index` at the written PNG, or embeds the texture when no PNG was written.
fn write_back_image(
    doc: &mut AssetDocument,
    index: usize,
    output_gltf: &Path,
    output_png: Option<&Path>,
    texture: &TextureBuffer,
) -> Result<()> {
    match output_png {
        Some(png) => doc.link_image(index, output_gltf, png)?,
        None => doc.embed_image(index, texture)?,
    }
    Ok(())
}

fn build_criteria<R: BufRead>(
    args: &Args,
    session: &RecolorSession,
    prompter: &mut Prompter<R>,
) -> Result<SelectionCriteria> {
    let method = match args.method {
        Some(method) => method,
        None => prompter.ask_parsed("Selection method (above/below/between/color/cluster/clusters)", Some("cluster"))?,
    };

    let criteria = match method {
        Method::Above | Method::Below => {
            let threshold = match args.threshold {
                Some(t) => t,
                None => prompter.ask_parsed("Brightness threshold (0-255)", Some("128"))?,
            };
            if method == Method::Above {
                SelectionCriteria::brightness_above(threshold)?
            } else {
                SelectionCriteria::brightness_below(threshold)?
            }
        }
        Method::Between => {
            let min = match args.min {
                Some(v) => v,
                None => prompter.ask_parsed("Minimum brightness (0-255)", Some("0"))?,
            };
            let max = match args.max {
                Some(v) => v,
                None => prompter.ask_parsed("Maximum brightness (0-255)", Some("255"))?,
            };
            SelectionCriteria::brightness_between(min, max)?
        }
        Method::Color => {
            let color = match args.match_color {
                Some(c) => c,
                None => prompter.ask_parsed("Color to match (#RRGGBB)", None)?,
            };
            let tolerance = match args.tolerance {
                Some(t) => t,
                None => prompter.ask_parsed("Tolerance %", Some("20"))?,
            };
            SelectionCriteria::color_match(color, tolerance)?
        }
        Method::Cluster | Method::Clusters => {
            let ids = if args.groups.is_empty() {
                parse_groups(&prompter.ask("Group id(s), comma separated", Some("0"))?)?
            } else {
                args.groups.clone()
            };
            if method == Method::Cluster && ids.len() != 1 {
                bail!("method `cluster` takes exactly one group id, got {}", ids.len());
            }
            let recommended = session.recommend_tolerance(&ids)?;
            let tolerance = match args.tolerance {
                Some(t) => t,
                None => prompter.ask_parsed("Tolerance %", Some(&recommended.to_string()))?,
            };
            session.criteria_for_groups(&ids, tolerance)?
        }
    };
    Ok(criteria)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let stdin = std::io::stdin();
    let mut prompter = Prompter { input: stdin.lock() };

    // --- 1. Texture Loading ---
    let mut document: Option<(PathBuf, AssetDocument)> = None;
    let (texture, texture_path): (TextureBuffer, Option<PathBuf>) = match (&args.texture, &args.gltf, args.image) {
        (Some(path), _, _) => {
            let texture = image_helper::load_texture(path)
                .with_context(|| format!("failed to load texture {}", path.display()))?;
            (texture, Some(path.clone()))
        }
        (None, Some(gltf_path), Some(index)) => {
            let doc = AssetDocument::load(gltf_path)
                .with_context(|| format!("failed to read glTF document {}", gltf_path.display()))?;
            let loaded = match doc.image_source(gltf_path, index)? {
                ImageSource::File(path) => {
                    let texture = image_helper::load_texture(&path)
                        .with_context(|| format!("failed to load texture {}", path.display()))?;
                    (texture, Some(path))
                }
                ImageSource::Embedded(uri) => {
                    let texture = image_helper::decode_data_uri(&uri)
                        .with_context(|| format!("failed to decode embedded image {index}"))?;
                    (texture, None)
                }
            };
            document = Some((gltf_path.clone(), doc));
            loaded
        }
        _ => bail!("pass --texture, or --gltf together with --image"),
    };

    // --- 2. Analysis ---
    let config = PipelineConfig {
        analysis: AnalysisConfig {
            cluster_count: args.clusters,
            sample_stride: args.sample_stride,
            seed: args.seed,
            ..AnalysisConfig::default()
        },
        ..PipelineConfig::default()
    };
    let mut session = RecolorSession::new(texture, config);
    let groups = session.analyze();
    if args.json {
        println!("{}", serde_json::to_string_pretty(groups)?);
    } else {
        println!("Dominant colors:");
        for group in groups {
            println!(
                "  [{}] {}  brightness {:>3}  {:>6.2}%",
                group.id, group.hex, group.brightness, group.coverage_percent
            );
        }
    }

    // --- 3. Selection & Dry Run ---
    let criteria = build_criteria(&args, &session, &mut prompter)?;
    let report = session.simulate(&criteria);
    println!("Selection {criteria}: {report}");
    if report.is_empty_selection() {
        log::warn!("selection matches no pixels, nothing to recolor");
        return Ok(());
    }

    // --- 4. Target & Confirmation ---
    let target = match args.target {
        Some(t) => t,
        None => prompter.ask_parsed("Target color (#RRGGBB)", None)?,
    };
    let mode = match args.mode {
        Some(m) => m,
        None => prompter.ask_parsed("Mode (smart/tint)", Some("smart"))?,
    };
    if !args.yes && !prompter.confirm(&format!("Recolor {} pixels to {target} ({mode})?", report.matched_pixels))? {
        println!("Aborted, nothing written.");
        return Ok(());
    }

    // --- 5. Commit & Output ---
    let commit = match parallel_recolorer(args.workers, session.texture().pixel_count()) {
        Some(recolorer) => {
            log::info!("committing on {} worker(s)", recolorer.worker_count());
            session.commit_parallel(&criteria, target, mode, &recolorer).await?
        }
        None => session.commit(&criteria, target, mode)?,
    };
    let output = args
        .output
        .clone()
        .or_else(|| texture_path.as_deref().map(|path| default_output(path, "png")));
    if let Some(output) = &output {
        image_helper::save_texture(output, session.texture())
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("Wrote {}", output.display());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&commit)?);
    }

    // --- 6. Material Synchronization ---
    if let (Some((gltf_path, mut doc)), Some(index)) = (document, args.image) {
        let output_gltf = args
            .output_gltf
            .clone()
            .unwrap_or_else(|| default_output(&gltf_path, "gltf"));
        write_back_image(&mut doc, index, &output_gltf, output.as_deref(), session.texture())?;
        let updated = session.sync_material(&mut doc, index, target)?;
        doc.save(&output_gltf)
            .with_context(|| format!("failed to write {}", output_gltf.display()))?;
        println!("Updated {updated} material(s) in {}", output_gltf.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn prompter_falls_back_to_defaults_and_reprompts() {
        let mut prompter = Prompter {
            input: Cursor::new("\nnot-a-number\n42\n"),
        };
        assert_eq!(prompter.ask("Tolerance", Some("20")).unwrap(), "20");
        let parsed: u8 = prompter.ask_parsed("Threshold", None).unwrap();
        assert_eq!(parsed, 42);
        assert!(prompter.ask("Anything", None).is_err());
    }

    #[test]
    fn group_lists_parse() {
        assert_eq!(parse_groups("1, 2,0").unwrap(), vec![1, 2, 0]);
        assert!(parse_groups("1,x").is_err());
    }

    #[test]
    fn method_names_parse_case_insensitively() {
        assert_eq!("Clusters".parse::<Method>().unwrap(), Method::Clusters);
        assert!("nearest".parse::<Method>().is_err());
    }

    #[test]
    fn outputs_default_next_to_the_input() {
        assert_eq!(
            default_output(Path::new("assets/crate.png"), "png"),
            PathBuf::from("assets/crate_recolored.png")
        );
    }

    const DOCUMENT: &str = r#"{
        "materials": [{ "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }],
        "textures": [{ "source": 0 }],
        "images": [{ "uri": "textures/body.png" }]
    }"#;

    #[test]
    fn recolored_png_is_linked_relative_to_the_written_gltf() {
        let gltf_path = Path::new("assets/sofa.gltf");
        let mut doc = AssetDocument::from_json(DOCUMENT).unwrap();
        let ImageSource::File(source) = doc.image_source(gltf_path, 0).unwrap() else {
            panic!("expected a file image");
        };
        let texture = TextureBuffer::from_pixels(1, 1, &[Pixel::BLACK]).unwrap();

        let output_png = default_output(&source, "png");
        let output_gltf = default_output(gltf_path, "gltf");
        write_back_image(&mut doc, 0, &output_gltf, Some(&output_png), &texture).unwrap();
        assert_eq!(doc.images[0].uri.as_deref(), Some("textures/body_recolored.png"));
        assert_eq!(
            doc.image_source(&output_gltf, 0).unwrap(),
            ImageSource::File(PathBuf::from("assets/textures/body_recolored.png"))
        );

        let elsewhere = Path::new("out/sofa.gltf");
        write_back_image(&mut doc, 0, elsewhere, Some(&output_png), &texture).unwrap();
        assert_eq!(doc.images[0].uri.as_deref(), Some("../assets/textures/body_recolored.png"));
    }

    #[test]
    fn embedded_images_are_embedded_back_without_an_output_png() {
        let mut doc = AssetDocument::from_json(DOCUMENT).unwrap();
        let texture = TextureBuffer::from_pixels(2, 1, &[Pixel::new(9, 8, 7), Pixel::WHITE]).unwrap();
        write_back_image(&mut doc, 0, Path::new("sofa_recolored.gltf"), None, &texture).unwrap();

        let gltf_path = Path::new("sofa_recolored.gltf");
        assert!(matches!(doc.image_source(gltf_path, 0).unwrap(), ImageSource::Embedded(_)));
        assert_eq!(doc.load_image(gltf_path, 0).unwrap(), texture);
    }

    #[test]
    fn large_textures_commit_in_parallel() {
        assert!(parallel_recolorer(None, 64 * 64).is_none());
        assert!(parallel_recolorer(None, PARALLEL_PIXEL_THRESHOLD).is_some());
        assert_eq!(parallel_recolorer(Some(3), 4).map(|r| r.worker_count()), Some(3));
    }

    #[test]
    fn cli_parses_a_scripted_run() {
        let args = Args::try_parse_from([
            "recolor-wizard",
            "--texture",
            "crate.png",
            "--method",
            "clusters",
            "--groups",
            "0,2",
            "--target",
            "#FF0000",
            "--mode",
            "tint",
            "--yes",
        ])
        .unwrap();
        assert_eq!(args.method, Some(Method::Clusters));
        assert_eq!(args.groups, vec![0, 2]);
        assert_eq!(args.target, Some(Pixel::new(255, 0, 0)));
        assert_eq!(args.mode, Some(TransformationMode::Tint));
        assert!(args.yes);
    }
}
