use catalog::bundled_shaders;
use renderer::compile_fragment;

#[test]
fn every_bundled_shader_compiles() {
    for shader in bundled_shaders() {
        if let Err(err) = compile_fragment(shader.source) {
            panic!("{} failed to compile:\n{err}", shader.name);
        }
    }
}

#[test]
fn diagnostics_point_at_user_lines() {
    let source = "void main() {\n    gl_FragColor = vec4(1.0);\n    undefined_call();\n}\n";
    let message = compile_fragment(source).unwrap_err().to_string();
    assert!(message.contains("undefined_call"), "unexpected diagnostic: {message}");
    assert!(message.contains("glsl:3:5"), "diagnostic not on user line 3: {message}");
}

#[test]
fn diagnostics_count_blanked_header_lines() {
    let source = "#version 100\nprecision mediump float;\nuniform float u_time;\n\nvoid main() {\n    gl_FragColor = vec4(missing_value);\n}\n";
    let message = compile_fragment(source).unwrap_err().to_string();
    assert!(message.contains("missing_value"), "unexpected diagnostic: {message}");
    assert!(message.contains("glsl:6:"), "diagnostic not on user line 6: {message}");
}
