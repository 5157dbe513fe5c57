//! Page served at `/` before the first deployment.

pub(crate) const BOOTSTRAP_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>siteship: nothing deployed yet</title>
  <style>
    body { font-family: system-ui, sans-serif; max-width: 40rem; margin: 4rem auto; padding: 0 1rem; line-height: 1.5; color: #222; }
    code, pre { font-family: ui-monospace, monospace; background: #f4f4f4; border-radius: 4px; }
    pre { padding: 0.75rem 1rem; overflow-x: auto; }
  </style>
</head>
<body>
  <h1>This site is ready for its first deployment</h1>
  <p>No <code>index.html</code> has been deployed here yet. Build your app, then push the output directory:</p>
  <pre>npm run build
siteship deploy --dir dist</pre>
  <p>Every file in the directory is uploaded, files from earlier deployments are removed, and this page is replaced by your app.</p>
</body>
</html>
"#;
