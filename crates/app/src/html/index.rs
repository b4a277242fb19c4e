pub const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Crowd Density Monitor</title>
  <style>
    body { margin: 0; font-family: system-ui, sans-serif; background: #0b1220; color: #e2e8f0; }
    main { max-width: 960px; margin: 0 auto; padding: 24px; }
    h1 { font-size: 1.4rem; margin: 0 0 16px; }
    #feed { width: 100%; border-radius: 8px; background: #000; }
    .metric { margin-top: 16px; font-size: 1.1rem; }
    .metric strong { font-variant-numeric: tabular-nums; }
    .bar { height: 10px; border-radius: 5px; background: #1e293b; overflow: hidden; margin-top: 8px; }
    .bar > div { height: 100%; width: 0; background: #4ade80; transition: width 0.3s, background 0.3s; }
    .still { margin-top: 24px; font-size: 0.95rem; }
  </style>
</head>
<body>
  <main>
    <h1>Crowd Density Monitor</h1>
    <img id="feed" src="/video_feed" alt="Live camera feed" />
    <div class="metric">Density: <strong id="density">0.000</strong></div>
    <div class="bar"><div id="density-bar"></div></div>
    <div class="still">
      <label>Analyze a photo: <input type="file" id="still-input" accept="image/jpeg,image/png" /></label>
      <div id="still-result"></div>
    </div>
  </main>
  <script>
    const valueEl = document.getElementById("density");
    const barEl = document.getElementById("density-bar");

    async function refreshDensity() {
      try {
        const response = await fetch("/density", { cache: "no-store" });
        if (!response.ok) return;
        const { density } = await response.json();
        valueEl.textContent = density.toFixed(3);
        const pct = Math.min(density, 1) * 100;
        barEl.style.width = pct + "%";
        barEl.style.background = density > 0.5 ? "#fb7185" : density > 0.2 ? "#facc15" : "#4ade80";
      } catch (err) {
        console.warn("density poll failed", err);
      }
    }

    document.getElementById("still-input").addEventListener("change", async (event) => {
      const file = event.target.files[0];
      const resultEl = document.getElementById("still-result");
      if (!file) return;
      try {
        const response = await fetch("/upload", { method: "POST", body: file });
        if (!response.ok) {
          resultEl.textContent = "Upload failed: " + (await response.text());
          return;
        }
        const { people, density } = await response.json();
        resultEl.textContent = people + " people, density " + density.toFixed(3);
      } catch (err) {
        resultEl.textContent = "Upload failed";
      }
    });

    refreshDensity();
    setInterval(refreshDensity, 1000);
  </script>
</body>
</html>
"##;
