use image::{ImageBuffer, Rgb, RgbaImage};
use lzw_stego::{
    cli::{CheckArgs, EmbedArgs, ExtractArgs},
    constants::HEADER_PIXELS,
    handler::{handle_check, handle_embed, handle_extract},
    lzw,
    raster::Raster,
    steganography,
};
use rand::RngCore;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// 一个辅助函数，用于创建一个带有随机像素的 RGB PNG 测试图像
fn create_test_png(path: &Path, width: u32, height: u32) {
    let mut img_buf = ImageBuffer::new(width, height);
    let mut raw_pixels = vec![0u8; (width * height * 3) as usize];
    rand::rng().fill_bytes(&mut raw_pixels);

    img_buf
        .pixels_mut()
        .zip(raw_pixels.chunks_exact(3))
        .for_each(|(pixel, chunk)| {
            *pixel = Rgb([chunk[0], chunk[1], chunk[2]]);
        });

    img_buf.save(path).expect("Failed to create test image.");
}

/// 一个辅助函数，用于创建一个全零像素的 24 位 BMP 测试图像
fn create_blank_bmp(path: &Path, width: u32, height: u32) {
    Raster::blank(width, height)
        .save(path)
        .expect("Failed to create test image.");
}

/// 11 字节的 "hello world" 嵌入 64x64 全零 BMP 后能逐字节恢复，且只改动了蓝色通道最低位
#[test]
fn test_hello_world_scenario() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let image_path = dir.path().join("cover.bmp");
    let hidden_path = dir.path().join("hidden.bmp");
    let payload_path = dir.path().join("greeting.txt");
    let recovered_base = dir.path().join("out");

    create_blank_bmp(&image_path, 64, 64);
    fs::write(&payload_path, b"hello world")?;

    // 2. 嵌入
    handle_embed(EmbedArgs {
        image: image_path.clone(),
        payload: payload_path.clone(),
        dest: Some(hidden_path.clone()),
        force: false,
    })?;

    // 3. 提取
    handle_extract(ExtractArgs {
        image: hidden_path.clone(),
        output: Some(recovered_base),
        force: false,
    })?;

    // 4. 验证结果
    let recovered = fs::read(dir.path().join("out.txt"))?;
    assert_eq!(recovered, b"hello world");

    let raster = Raster::load(&hidden_path)?;
    let (tag, codes) = steganography::extract(&raster)?;
    assert_eq!(tag.as_str(), "txt");
    assert_eq!(codes, lzw::encode(b"hello world")?);

    let used = HEADER_PIXELS + codes.len() * 32;
    for (i, pixel) in raster.pixels().iter().enumerate() {
        assert_eq!((pixel.red, pixel.green), (0, 0), "pixel {i} changed");
        assert_eq!(pixel.blue & 0xFE, 0, "pixel {i} changed above the LSB");
        if i >= used {
            assert_eq!(pixel.blue, 0, "pixel {i} lies outside the embedded region");
        }
    }

    // 头部与文件长度保持不变
    let original = fs::read(&image_path)?;
    let hidden = fs::read(&hidden_path)?;
    assert_eq!(original.len(), hidden.len());
    assert_eq!(original[..54], hidden[..54]);

    Ok(())
}

/// 验证当用户不提供输出路径时，是否能正确生成默认路径并完成操作 (PNG 输入)
#[test]
fn test_embed_and_extract_with_defaults() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let original_image_path = dir.path().join("original.png");
    let payload_path = dir.path().join("source.txt");

    create_test_png(&original_image_path, 100, 100);
    let original_text = "Testing default path generation. 测试默认路径生成。".repeat(4);
    fs::write(&payload_path, &original_text)?;

    // 2. 测试 handle_embed，不提供 dest 路径
    handle_embed(EmbedArgs {
        image: original_image_path.clone(),
        payload: payload_path.clone(),
        dest: None,
        force: false,
    })?;

    let expected_hidden_path = dir.path().join("doctored_original.png");
    assert!(
        expected_hidden_path.exists(),
        "Default hidden image should be created at: {:?}",
        expected_hidden_path
    );

    // 3. 测试 handle_extract，不提供输出路径
    handle_extract(ExtractArgs {
        image: expected_hidden_path,
        output: None,
        force: false,
    })?;

    let expected_recovered_path = dir.path().join("recovered_doctored_original.txt");
    assert!(
        expected_recovered_path.exists(),
        "Default recovered file should be created at: {:?}",
        expected_recovered_path
    );

    // 4. 验证结果
    let recovered_text = fs::read_to_string(&expected_recovered_path)?;
    assert_eq!(original_text, recovered_text);

    Ok(())
}

/// BMP 输入也可以输出为 PNG，并且能从 PNG 中恢复
#[test]
fn test_bmp_cover_saved_as_png() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("cover.bmp");
    let hidden_path = dir.path().join("hidden.png");
    let payload_path = dir.path().join("blob.bin");

    create_blank_bmp(&image_path, 63, 48);
    let mut payload = vec![0u8; 64];
    rand::rng().fill_bytes(&mut payload);
    fs::write(&payload_path, &payload)?;

    handle_embed(EmbedArgs {
        image: image_path,
        payload: payload_path,
        dest: Some(hidden_path.clone()),
        force: false,
    })?;
    handle_extract(ExtractArgs {
        image: hidden_path,
        output: Some(dir.path().join("restored")),
        force: false,
    })?;

    assert_eq!(fs::read(dir.path().join("restored.bin"))?, payload);
    Ok(())
}

/// 短扩展名按补零处理，没有扩展名时恢复的文件也没有扩展名
#[test]
fn test_short_and_missing_extensions() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("cover.bmp");
    create_blank_bmp(&image_path, 40, 40);

    for (name, recovered) in [("archive.gz", "plain.gz"), ("LICENSE", "plain")] {
        let payload_path = dir.path().join(name);
        let hidden_path = dir.path().join(format!("hidden_{name}.bmp"));
        fs::write(&payload_path, name.repeat(3))?;

        handle_embed(EmbedArgs {
            image: image_path.clone(),
            payload: payload_path,
            dest: Some(hidden_path.clone()),
            force: false,
        })?;
        handle_extract(ExtractArgs {
            image: hidden_path,
            output: Some(dir.path().join("plain")),
            force: true,
        })?;

        assert_eq!(
            fs::read_to_string(dir.path().join(recovered))?,
            name.repeat(3)
        );
    }
    Ok(())
}

/// 验证覆盖保护机制以及 `--force` 标志是否按预期工作
#[test]
fn test_overwrite_protection_and_force_flag() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let image_path = dir.path().join("image.png");
    let payload_path = dir.path().join("text.txt");
    let dest_path = dir.path().join("dest.png");

    create_test_png(&image_path, 50, 50);
    fs::write(&payload_path, "some text")?;

    // 2. 场景一：测试覆盖保护
    fs::write(&dest_path, "this is a dummy file to be overwritten")?;

    let result = handle_embed(EmbedArgs {
        image: image_path.clone(),
        payload: payload_path.clone(),
        dest: Some(dest_path.clone()),
        force: false,
    });
    assert!(result.is_err(), "Execution should fail without --force when file exists.");
    if let Err(e) = result {
        assert!(e.to_string().contains("Output file already exists"));
    }

    // 3. 场景二：测试强制覆盖
    let result = handle_embed(EmbedArgs {
        image: image_path,
        payload: payload_path,
        dest: Some(dest_path.clone()),
        force: true,
    });
    assert!(result.is_ok(), "Execution should succeed with --force when file exists.");

    let dummy_content = fs::read(&dest_path)?;
    assert_ne!(dummy_content, b"this is a dummy file to be overwritten");

    Ok(())
}

/// 验证空间不足时的错误处理，且不会写出目标文件
#[test]
fn test_embed_not_enough_space() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("small.png");
    let payload_path = dir.path().join("large.txt");
    let dest_path = dir.path().join("dest.png");

    create_test_png(&image_path, 10, 10);
    let mut large = vec![0u8; 5000];
    rand::rng().fill_bytes(&mut large);
    fs::write(&payload_path, large)?;

    let result = handle_embed(EmbedArgs {
        image: image_path,
        payload: payload_path,
        dest: Some(dest_path.clone()),
        force: false,
    });

    assert!(result.is_err());
    if let Err(e) = result {
        assert!(format!("{e:#}").contains("Not enough space"));
    }
    assert!(!dest_path.exists());

    Ok(())
}

/// 带 alpha 通道的 PNG 和非图像文件都会被拒绝
#[test]
fn test_rejects_unsupported_images() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let rgba_path = dir.path().join("alpha.png");
    let text_path = dir.path().join("not_an_image.bmp");
    let payload_path = dir.path().join("payload.txt");

    RgbaImage::new(20, 20).save(&rgba_path)?;
    fs::write(&text_path, "plain text pretending to be a bitmap")?;
    fs::write(&payload_path, "payload")?;

    for image in [rgba_path, text_path] {
        let result = handle_embed(EmbedArgs {
            image: image.clone(),
            payload: payload_path.clone(),
            dest: Some(dir.path().join("out.bmp")),
            force: false,
        });
        assert!(result.is_err(), "{image:?} should be rejected");

        assert!(handle_check(CheckArgs { image }).is_err());
    }
    assert!(!dir.path().join("out.bmp").exists());

    Ok(())
}

/// check 命令能识别两种受支持的格式
#[test]
fn test_check_supported_images() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let png_path = dir.path().join("cover.png");
    let bmp_path = dir.path().join("cover.bmp");
    create_test_png(&png_path, 16, 16);
    create_blank_bmp(&bmp_path, 16, 16);

    handle_check(CheckArgs { image: png_path })?;
    handle_check(CheckArgs { image: bmp_path })?;
    Ok(())
}
