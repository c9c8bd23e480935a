//! The external compressors and how each one is called.
//!
//! Every tool is described by three things: where its binary lives, the
//! argument template it is launched with, and how its exit code is read.
//!
//! | Tool | Arguments | Writes | Benign non-zero exit |
//! |---|---|---|---|
//! | advpng | `-z -4 <file>` | in place | - |
//! | pngout | `<name> <name> -y` (run in the file's directory) | in place | 2: no smaller output |
//! | optipng | `-o7 -zm1-9 <file>` | in place | - |
//! | pngquant | `--quality=100-100 -s1 --force --output <out> -- <in>` | `<out>` | 99: quality floor not met |
//! | gifsicle | `-O3 <in> -o <out>` | `<out>` | 1: no smaller output |
//! | jpegtran | `-copy none -optimize -outfile <out> <in>` | `<out>` | - |
//! | jfifremove | stdin `<in>`, stdout `<out>` | `<out>` | - |
//! | cwebp | `<in> -lossless -m 6 -o <out>` | `<out>` | - |
//! | gif2webp | `<in> -m 6 -o <out>` | `<out>` | - |
//! | convert | `<in> <out>` | `<out>` | - |
//!
//! Exit code 127 means "command not found" for every tool and is handled by
//! [`invoke`](super::invoke) before the per-tool rules apply.

use super::runner::{Invocation, Redirect};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Advpng,
    Pngout,
    Optipng,
    Pngquant,
    Gifsicle,
    Jpegtran,
    Jfifremove,
    Cwebp,
    Gif2webp,
    Convert,
}

/// Where a tool puts its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Rewrites its input file. The stage driver hands it a private copy.
    InPlace,
    /// Reads `<in>` and writes a new `<out>`.
    Separate,
}

/// How a finished process should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Success,
    /// A documented non-zero code meaning "nothing smaller was produced".
    NoImprovement,
    Failed,
}

const LIBRARY_HINT: &str = "Most likely a shared library it needs is not installed. \
     On Ubuntu run \"sudo apt-get install libjpeg62:i386\".";
const IMAGEMAGICK_HINT: &str = "Most likely ImageMagick is not installed. \
     On Ubuntu run \"sudo apt-get install imagemagick\".";

impl Tool {
    pub const ALL: [Tool; 10] = [
        Tool::Advpng,
        Tool::Pngout,
        Tool::Optipng,
        Tool::Pngquant,
        Tool::Gifsicle,
        Tool::Jpegtran,
        Tool::Jfifremove,
        Tool::Cwebp,
        Tool::Gif2webp,
        Tool::Convert,
    ];

    pub fn binary_name(self) -> &'static str {
        match self {
            Tool::Advpng => "advpng",
            Tool::Pngout => "pngout",
            Tool::Optipng => "optipng",
            Tool::Pngquant => "pngquant",
            Tool::Gifsicle => "gifsicle",
            Tool::Jpegtran => "jpegtran",
            Tool::Jfifremove => "jfifremove",
            Tool::Cwebp => "cwebp",
            Tool::Gif2webp => "gif2webp",
            Tool::Convert => "convert",
        }
    }

    /// ImageMagick is a system package; everything else ships in the
    /// binaries directory.
    pub fn on_search_path(self) -> bool {
        self == Tool::Convert
    }

    pub fn install_hint(self) -> &'static str {
        match self {
            Tool::Convert => IMAGEMAGICK_HINT,
            _ => LIBRARY_HINT,
        }
    }

    pub fn output_mode(self) -> OutputMode {
        match self {
            Tool::Advpng | Tool::Pngout | Tool::Optipng => OutputMode::InPlace,
            _ => OutputMode::Separate,
        }
    }

    /// Read an exit code. `None` means the process died from a signal.
    pub fn interpret(self, code: Option<i32>) -> ExitKind {
        match (self, code) {
            (_, Some(0)) => ExitKind::Success,
            (Tool::Pngquant, Some(99)) => ExitKind::NoImprovement,
            (Tool::Pngout, Some(2)) => ExitKind::NoImprovement,
            (Tool::Gifsicle, Some(1)) => ExitKind::NoImprovement,
            _ => ExitKind::Failed,
        }
    }

    /// Fill in the argument template. For in-place tools `input` and
    /// `output` are the same file.
    fn arguments(self, input: &Path, output: &Path) -> Vec<OsString> {
        match self {
            Tool::Advpng => args(["-z", "-4"], [output]),
            Tool::Pngout => {
                // pngout chokes on long paths, so it gets bare names and runs
                // inside the file's directory.
                let name = output.file_name().unwrap_or(output.as_os_str());
                vec![name.to_owned(), name.to_owned(), "-y".into()]
            }
            Tool::Optipng => args(["-o7", "-zm1-9"], [output]),
            Tool::Pngquant => {
                let mut list = args(
                    ["--quality=100-100", "-s1", "--force", "--output"],
                    [output],
                );
                list.push("--".into());
                list.push(input.as_os_str().to_owned());
                list
            }
            Tool::Gifsicle => vec![
                "-O3".into(),
                input.as_os_str().to_owned(),
                "-o".into(),
                output.as_os_str().to_owned(),
            ],
            Tool::Jpegtran => {
                let mut list = args(["-copy", "none", "-optimize", "-outfile"], [output]);
                list.push(input.as_os_str().to_owned());
                list
            }
            Tool::Jfifremove => Vec::new(),
            Tool::Cwebp => vec![
                input.as_os_str().to_owned(),
                "-lossless".into(),
                "-m".into(),
                "6".into(),
                "-o".into(),
                output.as_os_str().to_owned(),
            ],
            Tool::Gif2webp => vec![
                input.as_os_str().to_owned(),
                "-m".into(),
                "6".into(),
                "-o".into(),
                output.as_os_str().to_owned(),
            ],
            Tool::Convert => vec![input.as_os_str().to_owned(), output.as_os_str().to_owned()],
        }
    }
}

fn args<const F: usize, const P: usize>(flags: [&str; F], paths: [&Path; P]) -> Vec<OsString> {
    flags
        .iter()
        .map(|flag| OsString::from(*flag))
        .chain(paths.iter().map(|p| p.as_os_str().to_owned()))
        .collect()
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Resolves tool binaries and builds ready-to-run invocations.
#[derive(Debug, Clone)]
pub struct Toolbox {
    binaries_dir: PathBuf,
}

impl Toolbox {
    pub fn new(binaries_dir: impl Into<PathBuf>) -> Self {
        Self {
            binaries_dir: binaries_dir.into(),
        }
    }

    pub fn binaries_dir(&self) -> &Path {
        &self.binaries_dir
    }

    /// Path to the executable, with the platform suffix (`.exe` on Windows).
    pub fn program(&self, tool: Tool) -> PathBuf {
        let file = format!("{}{}", tool.binary_name(), std::env::consts::EXE_SUFFIX);
        if tool.on_search_path() {
            PathBuf::from(file)
        } else {
            self.binaries_dir.join(file)
        }
    }

    pub fn invocation(&self, tool: Tool, input: &Path, output: &Path) -> Invocation {
        let mut invocation = Invocation::new(tool, self.program(tool), input, output);
        invocation.args = tool.arguments(input, output);
        match tool {
            Tool::Pngout => invocation.current_dir = output.parent().map(Path::to_path_buf),
            Tool::Jfifremove => invocation.redirect = Redirect::FileToFile,
            _ => {}
        }
        invocation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(list: &[OsString]) -> Vec<&str> {
        list.iter().map(|s| s.to_str().unwrap()).collect()
    }

    #[test]
    fn program_lives_in_binaries_dir() {
        let toolbox = Toolbox::new("/opt/bin");
        let expected = format!("/opt/bin/optipng{}", std::env::consts::EXE_SUFFIX);
        assert_eq!(toolbox.program(Tool::Optipng), PathBuf::from(expected));
    }

    #[test]
    fn convert_is_resolved_from_search_path() {
        let toolbox = Toolbox::new("/opt/bin");
        let program = toolbox.program(Tool::Convert);
        assert!(program.parent().is_none_or(|p| p.as_os_str().is_empty()));
    }

    #[test]
    fn advpng_rewrites_in_place() {
        let toolbox = Toolbox::new("/bin");
        let file = Path::new("/tmp/s/a.png");
        let inv = toolbox.invocation(Tool::Advpng, file, file);
        assert_eq!(strings(&inv.args), ["-z", "-4", "/tmp/s/a.png"]);
        assert_eq!(Tool::Advpng.output_mode(), OutputMode::InPlace);
    }

    #[test]
    fn pngout_uses_bare_names_inside_directory() {
        let toolbox = Toolbox::new("/bin");
        let file = Path::new("/tmp/scratch/very/long/a.png");
        let inv = toolbox.invocation(Tool::Pngout, file, file);
        assert_eq!(strings(&inv.args), ["a.png", "a.png", "-y"]);
        assert_eq!(
            inv.current_dir.as_deref(),
            Some(Path::new("/tmp/scratch/very/long"))
        );
    }

    #[test]
    fn pngquant_writes_explicit_output() {
        let toolbox = Toolbox::new("/bin");
        let inv = toolbox.invocation(
            Tool::Pngquant,
            Path::new("/s/a.png"),
            Path::new("/s/a.3.png"),
        );
        assert_eq!(
            strings(&inv.args),
            [
                "--quality=100-100",
                "-s1",
                "--force",
                "--output",
                "/s/a.3.png",
                "--",
                "/s/a.png"
            ]
        );
    }

    #[test]
    fn jpegtran_template() {
        let toolbox = Toolbox::new("/bin");
        let inv = toolbox.invocation(Tool::Jpegtran, Path::new("/s/a.jpg"), Path::new("/s/b.jpg"));
        assert_eq!(
            strings(&inv.args),
            ["-copy", "none", "-optimize", "-outfile", "/s/b.jpg", "/s/a.jpg"]
        );
    }

    #[test]
    fn jfifremove_streams_through_stdio() {
        let toolbox = Toolbox::new("/bin");
        let inv = toolbox.invocation(Tool::Jfifremove, Path::new("/s/a.jpg"), Path::new("/s/b.jpg"));
        assert!(inv.args.is_empty());
        assert_eq!(inv.redirect, Redirect::FileToFile);
    }

    #[test]
    fn webp_templates() {
        let toolbox = Toolbox::new("/bin");
        let inv = toolbox.invocation(Tool::Cwebp, Path::new("/s/a.png"), Path::new("/s/a.webp"));
        assert_eq!(
            strings(&inv.args),
            ["/s/a.png", "-lossless", "-m", "6", "-o", "/s/a.webp"]
        );
        let inv = toolbox.invocation(Tool::Gif2webp, Path::new("/s/a.gif"), Path::new("/s/a.webp"));
        assert_eq!(strings(&inv.args), ["/s/a.gif", "-m", "6", "-o", "/s/a.webp"]);
    }

    #[test]
    fn benign_exit_codes_are_tool_specific() {
        assert_eq!(Tool::Pngquant.interpret(Some(99)), ExitKind::NoImprovement);
        assert_eq!(Tool::Pngout.interpret(Some(2)), ExitKind::NoImprovement);
        assert_eq!(Tool::Gifsicle.interpret(Some(1)), ExitKind::NoImprovement);
        assert_eq!(Tool::Optipng.interpret(Some(99)), ExitKind::Failed);
        assert_eq!(Tool::Pngquant.interpret(Some(2)), ExitKind::Failed);
        assert_eq!(Tool::Advpng.interpret(Some(1)), ExitKind::Failed);
    }

    #[test]
    fn zero_is_success_and_signal_is_failure() {
        for tool in Tool::ALL {
            assert_eq!(tool.interpret(Some(0)), ExitKind::Success);
            assert_eq!(tool.interpret(None), ExitKind::Failed);
        }
    }

    #[test]
    fn convert_hint_mentions_imagemagick() {
        assert!(Tool::Convert.install_hint().contains("ImageMagick"));
        assert!(Tool::Jpegtran.install_hint().contains("libjpeg62"));
    }

    #[test]
    fn flags_precede_paths() {
        let list = args(["-a", "-b"], [Path::new("x")]);
        assert_eq!(strings(&list), ["-a", "-b", "x"]);
    }
}
