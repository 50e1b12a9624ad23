use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::codecs::hdr::HdrEncoder;

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hdrgain-bake"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&dyn AsRef<OsStr>]) -> Output {
    let mut cmd = bin();
    for arg in args {
        let arg: &OsStr = arg.as_ref();
        cmd.arg(arg);
    }
    cmd.output().expect("spawn hdrgain-bake")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hdrgain-bake-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_hdr(path: &Path, width: usize, height: usize, peak: f32) {
    let pixels: Vec<image::Rgb<f32>> = (0..width * height)
        .map(|i| {
            let t = (i % width) as f32 / width as f32;
            image::Rgb([t * peak, t * peak * 0.8, t * peak * 0.5])
        })
        .collect();
    let file = BufWriter::new(File::create(path).unwrap());
    HdrEncoder::new(file).encode(&pixels, width, height).unwrap();
}

#[test]
fn directory_with_a_corrupt_file_fails_but_converts_the_rest() {
    let root = scratch("mixed");
    let input = root.join("in");
    let output = root.join("out");
    fs::create_dir_all(input.join("sub")).unwrap();
    write_hdr(&input.join("one.hdr"), 32, 16, 20.0);
    write_hdr(&input.join("sub/two.hdr"), 16, 16, 4.0);
    fs::write(input.join("bad.hdr"), b"not an image").unwrap();

    let out = run(&[&input, &output]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("Baked 2 file(s), skipped 0, failed 1"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("bad.hdr"));
    assert!(output.join("one.jpg").is_file());
    assert!(output.join("sub/two.jpg").is_file());

    let again = run(&[&input, &output]);
    assert_eq!(again.status.code(), Some(1));
    assert!(stdout(&again).contains("Baked 0 file(s), skipped 2, failed 1"));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn clean_batch_succeeds_and_probes() {
    let root = scratch("clean");
    let input = root.join("in");
    let output = root.join("out");
    fs::create_dir_all(&input).unwrap();
    write_hdr(&input.join("scene.hdr"), 40, 20, 30.0);

    let out = run(&[
        &"bake",
        &input,
        &output,
        &"--quality",
        &"90",
        &"--scale",
        &"4",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("Baked 1 file(s), skipped 0, failed 0"));

    let probed = run(&[&"probe", &output.join("scene.jpg")]);
    assert!(probed.status.success());
    let text = stdout(&probed);
    assert!(text.contains("gain map version: 1.0"), "{text}");
    assert!(text.contains("10x5"), "{text}");
    assert!(text.contains("inline XMP"), "{text}");
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn siblings_mode_writes_two_files() {
    let root = scratch("siblings");
    let input = root.join("scene.hdr");
    write_hdr(&input, 16, 8, 8.0);

    let out = run(&[&input, &root.join("scene.jpg"), &"--siblings"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(root.join("scene_sdr.jpg").is_file());
    assert!(root.join("scene_gain_map.jpg").is_file());
    assert!(!root.join("scene.jpg").exists());

    let probed = run(&[&"probe", &root.join("scene_sdr.jpg")]);
    assert!(stdout(&probed).contains("no gain map metadata found"));

    let again = run(&[&input, &root.join("scene.jpg"), &"--siblings"]);
    assert!(stdout(&again).contains("skipped 1"));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn quality_applies_to_the_gain_map_too() {
    let root = scratch("quality");
    let input = root.join("scene.hdr");
    write_hdr(&input, 48, 32, 40.0);
    let bake = |name: &str, extra: &[&str]| -> Vec<u8> {
        let out_dir = root.join(name);
        fs::create_dir_all(&out_dir).unwrap();
        let mut args: Vec<&dyn AsRef<OsStr>> = Vec::new();
        let output = out_dir.join("scene.jpg");
        args.push(&input);
        args.push(&output);
        args.push(&"--siblings");
        args.push(&"--scale");
        args.push(&"1");
        for arg in extra {
            args.push(arg);
        }
        let out = run(&args);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        fs::read(out_dir.join("scene_gain_map.jpg")).unwrap()
    };

    let low = bake("low", &["--quality", "30"]);
    let explicit = bake("explicit", &["--quality", "95", "--gm-q", "30"]);
    let high = bake("high", &["--quality", "30", "--gm-q", "95"]);
    assert_eq!(low, explicit);
    assert_ne!(low, high);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn missing_input_is_an_error() {
    let root = scratch("missing");
    let out = run(&[&root.join("nope.hdr"), &root.join("out.jpg")]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("nope.hdr"));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn resize_requires_confirmation() {
    let root = scratch("resize");
    let path = root.join("photo.png");
    image::RgbImage::from_pixel(40, 30, image::Rgb([200, 100, 50]))
        .save(&path)
        .unwrap();

    let refused = run(&[&"resize", &root, &"50"]);
    assert!(!refused.status.success());
    assert_eq!(image::image_dimensions(&path).unwrap(), (40, 30));

    let out = run(&[&"resize", &root, &"50", &"--yes"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(image::image_dimensions(&path).unwrap(), (20, 15));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn tiff_directory_becomes_png() {
    let root = scratch("tiff");
    let src = root.join("tiffs");
    let dst = root.join("pngs");
    fs::create_dir_all(src.join("nested")).unwrap();
    image::RgbImage::from_pixel(8, 4, image::Rgb([1, 2, 3]))
        .save(src.join("a.tif"))
        .unwrap();
    image::RgbImage::from_pixel(4, 4, image::Rgb([9, 9, 9]))
        .save(src.join("nested/b.tiff"))
        .unwrap();

    let out = run(&[&"tiff2png", &src, &dst]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("Converted 2 file(s)"));
    assert_eq!(image::image_dimensions(dst.join("a.png")).unwrap(), (8, 4));
    assert!(dst.join("nested/b.png").is_file());
    let _ = fs::remove_dir_all(&root);
}
